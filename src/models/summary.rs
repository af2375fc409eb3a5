use super::limits::Tier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub asset: String,
    pub endpoint_count: usize,
    pub categories: Vec<String>,
}

/// Pre-aggregated counts stored next to the permission table for cheap display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub tier: Tier,
    pub total_endpoints: usize,
    #[serde(default)]
    pub static_endpoints: usize,
    pub assets: Vec<AssetSummary>,
}

impl PermissionSummary {
    pub fn asset(&self, name: &str) -> Option<&AssetSummary> {
        self.assets.iter().find(|a| a.asset == name)
    }
}
