use crate::models::{
    EndpointDescriptor, EndpointQuery, IndexedEndpoint, InvalidParameter, ParameterValidation,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

const MIN_PATH_SEGMENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathParts<'a> {
    pub asset: &'a str,
    pub category: &'a str,
    pub metric: &'a str,
}

/// Splits `/version/asset/category/metric...`. Paths with fewer than five `/`-separated
/// segments (the empty leading one included) are rejected.
pub fn split_endpoint_path(path: &str) -> Option<PathParts<'_>> {
    let mut segments = path.splitn(MIN_PATH_SEGMENTS, '/');
    let _leading = segments.next()?;
    let _version = segments.next()?;
    let asset = segments.next()?;
    let category = segments.next()?;
    let metric = segments.next()?;
    Some(PathParts {
        asset,
        category,
        metric,
    })
}

fn composite_key(asset: &str, category: &str) -> String {
    format!("{}/{}", asset, category)
}

/// Immutable endpoint index; a new fetch builds a new catalog.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    endpoints: Vec<IndexedEndpoint>,
    by_asset: HashMap<String, Vec<usize>>,
    by_category: HashMap<String, Vec<usize>>,
    by_asset_category: HashMap<String, Vec<usize>>,
    fetched_at: DateTime<Utc>,
}

impl EndpointCatalog {
    pub fn parse(raw: Vec<EndpointDescriptor>) -> Self {
        let mut catalog = Self {
            endpoints: Vec::with_capacity(raw.len()),
            by_asset: HashMap::new(),
            by_category: HashMap::new(),
            by_asset_category: HashMap::new(),
            fetched_at: Utc::now(),
        };
        let mut discarded = 0usize;

        for descriptor in raw {
            let Some(parts) = split_endpoint_path(&descriptor.path) else {
                discarded += 1;
                continue;
            };
            let indexed = IndexedEndpoint {
                asset: parts.asset.to_string(),
                category: parts.category.to_string(),
                metric: parts.metric.to_string(),
                path: descriptor.path.clone(),
                parameters: descriptor.parameters,
                required_parameters: descriptor.required_parameters,
            };
            let position = catalog.endpoints.len();
            catalog
                .by_asset
                .entry(indexed.asset.clone())
                .or_default()
                .push(position);
            catalog
                .by_category
                .entry(indexed.category.clone())
                .or_default()
                .push(position);
            catalog
                .by_asset_category
                .entry(composite_key(&indexed.asset, &indexed.category))
                .or_default()
                .push(position);
            catalog.endpoints.push(indexed);
        }

        if discarded > 0 {
            tracing::debug!(discarded, "Skipped malformed endpoint paths");
        }
        tracing::info!(
            endpoints = catalog.endpoints.len(),
            assets = catalog.by_asset.len(),
            categories = catalog.by_category.len(),
            "Endpoint catalog indexed"
        );
        catalog
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn endpoints(&self) -> &[IndexedEndpoint] {
        &self.endpoints
    }

    fn resolve(&self, positions: Option<&Vec<usize>>) -> Vec<&IndexedEndpoint> {
        positions
            .map(|list| list.iter().map(|&i| &self.endpoints[i]).collect())
            .unwrap_or_default()
    }

    pub fn by_asset(&self, asset: &str) -> Vec<&IndexedEndpoint> {
        self.resolve(self.by_asset.get(asset))
    }

    pub fn by_category(&self, category: &str) -> Vec<&IndexedEndpoint> {
        self.resolve(self.by_category.get(category))
    }

    pub fn by_asset_category(&self, asset: &str, category: &str) -> Vec<&IndexedEndpoint> {
        self.resolve(self.by_asset_category.get(&composite_key(asset, category)))
    }

    /// Most specific index wins (asset+category, asset, category, everything), then an
    /// optional case-insensitive substring filter on path or metric.
    pub fn search(&self, query: &EndpointQuery) -> Vec<&IndexedEndpoint> {
        let asset = query.asset.as_deref().filter(|s| !s.is_empty());
        let category = query.category.as_deref().filter(|s| !s.is_empty());

        let base = match (asset, category) {
            (Some(asset), Some(category)) => self.by_asset_category(asset, category),
            (Some(asset), None) => self.by_asset(asset),
            (None, Some(category)) => self.by_category(category),
            (None, None) => self.endpoints.iter().collect(),
        };

        match query.query.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                base.into_iter()
                    .filter(|e| {
                        e.path.to_lowercase().contains(&needle)
                            || e.metric.to_lowercase().contains(&needle)
                    })
                    .collect()
            }
            None => base,
        }
    }

    pub fn lookup_by_path(&self, path: &str) -> Option<&IndexedEndpoint> {
        let parts = split_endpoint_path(path)?;
        self.by_asset_category
            .get(&composite_key(parts.asset, parts.category))?
            .iter()
            .map(|&i| &self.endpoints[i])
            .find(|e| e.path == path)
    }

    pub fn parameter_options_for_path(&self, path: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.lookup_by_path(path).map(|e| &e.parameters)
    }

    pub fn assets(&self) -> Vec<&str> {
        let mut assets: Vec<&str> = self.by_asset.keys().map(String::as_str).collect();
        assets.sort_unstable();
        assets
    }

    pub fn categories(&self, asset: Option<&str>) -> Vec<&str> {
        let mut categories: Vec<&str> = match asset {
            Some(asset) => self
                .by_asset(asset)
                .into_iter()
                .map(|e| e.category.as_str())
                .collect(),
            None => self.by_category.keys().map(String::as_str).collect(),
        };
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}

/// Reports every missing required parameter and every value outside its declared set.
/// Parameters the endpoint does not declare pass through unchecked.
pub fn validate_parameters(
    endpoint: &IndexedEndpoint,
    supplied: &BTreeMap<String, String>,
) -> ParameterValidation {
    let missing: Vec<String> = endpoint
        .required_parameters
        .iter()
        .filter(|name| supplied.get(*name).map_or(true, |v| v.is_empty()))
        .cloned()
        .collect();

    let invalid: Vec<InvalidParameter> = supplied
        .iter()
        .filter_map(|(name, value)| {
            let allowed = endpoint.parameters.get(name)?;
            if allowed.is_empty() || allowed.iter().any(|a| a == value) {
                return None;
            }
            Some(InvalidParameter {
                name: name.clone(),
                value: value.clone(),
                allowed: allowed.clone(),
            })
        })
        .collect();

    ParameterValidation {
        valid: missing.is_empty() && invalid.is_empty(),
        missing,
        invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            path: path.to_string(),
            parameters: BTreeMap::new(),
            required_parameters: Vec::new(),
        }
    }

    fn sample() -> Vec<EndpointDescriptor> {
        let mut price = descriptor("/v1/btc/market-data/price_usd_close");
        price.parameters.insert(
            "interval".to_string(),
            vec!["24h".to_string(), "1h".to_string()],
        );
        price.parameters.insert("currency".to_string(), vec![]);
        price.required_parameters = vec!["a".to_string(), "interval".to_string()];
        vec![
            price,
            descriptor("/v1/btc/addresses/active_count"),
            descriptor("/v1/eth/market-data/marketcap_usd"),
            descriptor("/v1/eth/derivatives/futures/open_interest/sum"),
            descriptor("/v1/broken"),
            descriptor("/v1/btc/market-data"),
        ]
    }

    #[test]
    fn split_keeps_slashes_in_metric() {
        let parts = split_endpoint_path("/v1/eth/derivatives/futures/open_interest/sum")
            .expect("valid path");
        assert_eq!(parts.asset, "eth");
        assert_eq!(parts.category, "derivatives");
        assert_eq!(parts.metric, "futures/open_interest/sum");
        assert!(split_endpoint_path("/v1/btc/market").is_none());
    }

    #[test]
    fn malformed_paths_are_never_indexed() {
        let catalog = EndpointCatalog::parse(sample());
        assert_eq!(catalog.len(), 4);
        assert!(catalog.search(&EndpointQuery::default()).iter().all(|e| e.path != "/v1/broken"));
        assert!(catalog.lookup_by_path("/v1/btc/market-data").is_none());
    }

    #[test]
    fn every_endpoint_lands_in_its_three_indexes() {
        let catalog = EndpointCatalog::parse(sample());
        for endpoint in catalog.endpoints() {
            assert!(catalog.by_asset(&endpoint.asset).contains(&endpoint));
            assert!(catalog.by_category(&endpoint.category).contains(&endpoint));
            assert!(catalog
                .by_asset_category(&endpoint.asset, &endpoint.category)
                .contains(&endpoint));
        }
        assert_eq!(catalog.by_asset("btc").len(), 2);
        assert_eq!(catalog.by_category("market-data").len(), 2);
    }

    #[test]
    fn index_membership_does_not_depend_on_input_order() {
        let forward = EndpointCatalog::parse(sample());
        let mut reversed_input = sample();
        reversed_input.reverse();
        let reversed = EndpointCatalog::parse(reversed_input);

        let mut a: Vec<_> = forward.by_asset("btc").iter().map(|e| e.path.clone()).collect();
        let mut b: Vec<_> = reversed.by_asset("btc").iter().map(|e| e.path.clone()).collect();
        assert_ne!(a, b, "order mirrors input order");
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_search_returns_every_endpoint_once() {
        let catalog = EndpointCatalog::parse(sample());
        let all = catalog.search(&EndpointQuery::default());
        assert_eq!(all.len(), catalog.len());
        let paths: std::collections::HashSet<_> = all.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths.len(), catalog.len());
    }

    #[test]
    fn search_prefers_most_specific_index() {
        let catalog = EndpointCatalog::parse(sample());
        let hits = catalog.search(&EndpointQuery {
            asset: Some("btc".to_string()),
            category: Some("market-data".to_string()),
            query: None,
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metric, "price_usd_close");

        let by_category = catalog.search(&EndpointQuery {
            category: Some("market-data".to_string()),
            ..EndpointQuery::default()
        });
        assert!(by_category.iter().all(|e| e.category == "market-data"));
        assert_eq!(by_category.len(), 2);
    }

    #[test]
    fn search_query_is_case_insensitive_substring() {
        let catalog = EndpointCatalog::parse(sample());
        let hits = catalog.search(&EndpointQuery {
            query: Some("OPEN_INTEREST".to_string()),
            ..EndpointQuery::default()
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].asset, "eth");

        let none = catalog.search(&EndpointQuery {
            asset: Some("btc".to_string()),
            query: Some("marketcap".to_string()),
            ..EndpointQuery::default()
        });
        assert!(none.is_empty());
    }

    #[test]
    fn parameter_options_follow_path_lookup() {
        let catalog = EndpointCatalog::parse(sample());
        let options = catalog
            .parameter_options_for_path("/v1/btc/market-data/price_usd_close")
            .expect("known endpoint");
        assert_eq!(options["interval"], vec!["24h", "1h"]);
        assert!(catalog.parameter_options_for_path("/v1/btc/market-data/nope").is_none());
    }

    #[test]
    fn listing_helpers_are_sorted_and_distinct() {
        let catalog = EndpointCatalog::parse(sample());
        assert_eq!(catalog.assets(), vec!["btc", "eth"]);
        assert_eq!(catalog.categories(Some("eth")), vec!["derivatives", "market-data"]);
        assert_eq!(
            catalog.categories(None),
            vec!["addresses", "derivatives", "market-data"]
        );
    }

    #[test]
    fn validate_parameters_reports_missing_and_invalid_values() {
        let catalog = EndpointCatalog::parse(sample());
        let endpoint = catalog
            .lookup_by_path("/v1/btc/market-data/price_usd_close")
            .expect("known endpoint");

        let mut supplied = BTreeMap::new();
        supplied.insert("interval".to_string(), "5m".to_string());
        supplied.insert("currency".to_string(), "EUR".to_string());
        supplied.insert("format".to_string(), "csv".to_string());

        let result = validate_parameters(endpoint, &supplied);
        assert!(!result.valid);
        assert_eq!(result.missing, vec!["a"]);
        assert_eq!(result.invalid.len(), 1);
        assert_eq!(result.invalid[0].name, "interval");
        assert_eq!(result.errors().len(), 2);

        supplied.insert("a".to_string(), "BTC".to_string());
        supplied.insert("interval".to_string(), "24h".to_string());
        assert!(validate_parameters(endpoint, &supplied).valid);
    }
}
