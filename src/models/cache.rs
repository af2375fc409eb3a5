use super::limits::{ParsedLimits, Tier};
use super::summary::PermissionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub service_url: String,
    /// Leading characters of the API key; a mismatch means the account changed.
    pub credential_prefix: String,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub tier: Tier,
}

/// On-disk snapshot of one successful fetch-and-parse cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: String,
    pub metadata: CacheMetadata,
    pub raw_response: serde_json::Value,
    pub parsed: ParsedLimits,
    pub summary: PermissionSummary,
}
