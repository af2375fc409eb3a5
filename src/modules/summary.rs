use crate::models::{AssetSummary, PermissionSummary, PermissionTable, Tier};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
struct AssetAccumulator {
    endpoints: usize,
    categories: BTreeSet<String>,
}

/// Counts one endpoint per metric leaf and per static path, grouped by asset.
pub fn build_summary(
    table: Option<&PermissionTable>,
    statics: &[String],
    tier: Tier,
) -> PermissionSummary {
    let mut per_asset: BTreeMap<String, AssetAccumulator> = BTreeMap::new();

    if let Some(table) = table {
        for (asset, category, _, _) in table.leaves() {
            let entry = per_asset.entry(asset.to_string()).or_default();
            entry.endpoints += 1;
            entry.categories.insert(category.to_string());
        }
    }

    let mut static_endpoints = 0usize;
    for path in statics {
        let segments: Vec<&str> = path.split('/').collect();
        let (Some(asset), Some(category)) = (segments.get(2), segments.get(3)) else {
            tracing::debug!(path = %path, "Static endpoint path too short to summarize");
            continue;
        };
        if asset.is_empty() {
            continue;
        }
        static_endpoints += 1;
        let entry = per_asset.entry(asset.to_string()).or_default();
        entry.endpoints += 1;
        if !category.is_empty() {
            entry.categories.insert(category.to_string());
        }
    }

    let assets: Vec<AssetSummary> = per_asset
        .into_iter()
        .map(|(asset, acc)| AssetSummary {
            asset,
            endpoint_count: acc.endpoints,
            categories: acc.categories.into_iter().collect(),
        })
        .collect();

    PermissionSummary {
        tier,
        total_endpoints: assets.iter().map(|a| a.endpoint_count).sum(),
        static_endpoints,
        assets,
    }
}
