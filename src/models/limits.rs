use crate::modules::limits::duration::DurationLimit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Advanced,
    Professional,
    Premium,
    Custom,
    #[default]
    Unknown,
}

impl Tier {
    /// Case-insensitive match against the known tiers; anything else is `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "basic" => Self::Basic,
            "advanced" => Self::Advanced,
            "professional" => Self::Professional,
            "premium" => Self::Premium,
            "custom" => Self::Custom,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Professional => "professional",
            Self::Premium => "premium",
            Self::Custom => "custom",
            Self::Unknown => "unknown",
        }
    }

    /// Tiers assumed to reach endpoints their permission table does not list.
    pub fn has_implicit_access(&self) -> bool {
        matches!(self, Self::Professional | Self::Premium | Self::Custom)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub tokens: u64,
    pub reset_window: String,
}

pub type WindowLimits = BTreeMap<String, DurationLimit>;

/// `asset -> category -> metric -> {window -> limit}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable {
    assets: BTreeMap<String, BTreeMap<String, BTreeMap<String, WindowLimits>>>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty window sets are never stored.
    pub fn insert(&mut self, asset: &str, category: &str, metric: &str, windows: WindowLimits) {
        if windows.is_empty() {
            return;
        }
        self.assets
            .entry(asset.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default()
            .insert(metric.to_string(), windows);
    }

    pub fn get(&self, asset: &str, category: &str, metric: &str) -> Option<&WindowLimits> {
        self.assets.get(asset)?.get(category)?.get(metric)
    }

    pub fn contains(&self, asset: &str, category: &str, metric: &str) -> bool {
        self.get(asset, category, metric).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn categories(&self, asset: &str) -> impl Iterator<Item = &str> {
        self.assets
            .get(asset)
            .into_iter()
            .flat_map(|categories| categories.keys().map(String::as_str))
    }

    /// Flat walk over every `(asset, category, metric, windows)` leaf.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, &str, &str, &WindowLimits)> {
        self.assets.iter().flat_map(|(asset, categories)| {
            categories.iter().flat_map(move |(category, metrics)| {
                metrics.iter().map(move |(metric, windows)| {
                    (asset.as_str(), category.as_str(), metric.as_str(), windows)
                })
            })
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn window_count(&self) -> usize {
        self.leaves().map(|(_, _, _, windows)| windows.len()).sum()
    }
}

/// Normalized fragment extracted from one plan-limits payload. Also the `parsed`
/// section of the cache record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedLimits {
    #[serde(default)]
    pub table: Option<PermissionTable>,
    #[serde(default)]
    pub statics: Vec<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_name: Option<String>,
}

/// Resolved permission data held by a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionState {
    pub tier: Tier,
    pub table: Option<PermissionTable>,
    pub statics: Vec<String>,
    pub rate_limit: Option<RateLimit>,
    pub loaded_at: DateTime<Utc>,
}

impl PermissionState {
    pub fn from_parsed(parsed: ParsedLimits, tier: Tier) -> Self {
        Self {
            tier,
            table: parsed.table,
            statics: parsed.statics,
            rate_limit: parsed.rate_limit,
            loaded_at: Utc::now(),
        }
    }

    /// Loaded-with-defaults state used when the plan-limits endpoint refuses the caller.
    pub fn restricted_basic() -> Self {
        Self {
            tier: Tier::Basic,
            table: None,
            statics: Vec::new(),
            rate_limit: None,
            loaded_at: Utc::now(),
        }
    }

    pub fn is_static(&self, path: &str) -> bool {
        self.statics.iter().any(|p| p == path)
    }
}
