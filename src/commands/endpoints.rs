use super::SessionServiceState;
use crate::models::{EndpointQuery, IndexedEndpoint, Tier};
use crate::modules::catalog::split_endpoint_path;
use crate::modules::limits::{has_endpoint_access, required_plan};
use crate::modules::session::QueryOutcome;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct EndpointEntry {
    pub path: String,
    pub asset: String,
    pub category: String,
    pub metric: String,
    pub accessible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointListing {
    pub total: usize,
    pub tier: Tier,
    pub endpoints: Vec<EndpointEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetEntry {
    pub asset: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitEntry {
    pub window: String,
    pub limit: String,
    pub description: String,
    pub earliest_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointDetail {
    pub path: String,
    pub endpoint: Option<IndexedEndpoint>,
    pub parameters: BTreeMap<String, Vec<String>>,
    pub accessible: bool,
    pub is_static: bool,
    pub required_plan: Tier,
    pub limits: Vec<LimitEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub path: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// `YYYY-MM-DD` start of the requested range.
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
}

pub async fn list_endpoints(
    state: &SessionServiceState,
    query: EndpointQuery,
) -> Result<EndpointListing, String> {
    let coordinator = state.coordinator.read().await;
    let session = coordinator.state();
    let endpoints: Vec<EndpointEntry> = coordinator
        .search(&query)
        .into_iter()
        .map(|e| EndpointEntry {
            path: e.path.clone(),
            asset: e.asset.clone(),
            category: e.category.clone(),
            metric: e.metric.clone(),
            accessible: has_endpoint_access(session, &e.path),
        })
        .collect();
    Ok(EndpointListing {
        total: endpoints.len(),
        tier: session.tier(),
        endpoints,
    })
}

pub async fn list_assets(state: &SessionServiceState) -> Result<Vec<AssetEntry>, String> {
    let coordinator = state.coordinator.read().await;
    let Some(catalog) = coordinator.catalog() else {
        return Ok(Vec::new());
    };
    Ok(catalog
        .assets()
        .into_iter()
        .map(|asset| AssetEntry {
            asset: asset.to_string(),
            categories: catalog
                .categories(Some(asset))
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect())
}

pub async fn endpoint_detail(
    state: &SessionServiceState,
    path: String,
) -> Result<EndpointDetail, String> {
    let coordinator = state.coordinator.read().await;
    let session = coordinator.state();
    let endpoint = coordinator.lookup(&path).cloned();
    let is_static = session
        .permissions
        .as_ref()
        .is_some_and(|p| p.is_static(&path));
    let windows = split_endpoint_path(&path)
        .and_then(|parts| session.table()?.get(parts.asset, parts.category, parts.metric));

    if endpoint.is_none() && !is_static && windows.is_none() {
        return Err(format!("unknown_endpoint: {}", path));
    }

    let limits = windows
        .map(|windows| {
            windows
                .iter()
                .map(|(window, limit)| LimitEntry {
                    window: window.clone(),
                    limit: limit.token(),
                    description: limit.to_string(),
                    earliest_date: limit.earliest_date(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(EndpointDetail {
        parameters: coordinator
            .catalog()
            .and_then(|c| c.parameter_options_for_path(&path))
            .cloned()
            .unwrap_or_default(),
        accessible: has_endpoint_access(session, &path),
        required_plan: required_plan(session, &path),
        is_static,
        limits,
        endpoint,
        path,
    })
}

pub async fn execute_query(
    state: &SessionServiceState,
    request: QueryRequest,
) -> Result<QueryOutcome, String> {
    let since = match request.since.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| format!("invalid_since_date: {} ({})", raw, e))?,
        ),
        _ => None,
    };
    let coordinator = state.coordinator.read().await;
    Ok(coordinator
        .execute_query(
            &request.path,
            &request.params,
            since,
            request.window.as_deref(),
        )
        .await?)
}
