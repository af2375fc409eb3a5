use super::limits::{PermissionState, PermissionTable, RateLimit, Tier};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// The single live session owned by a coordinator. `Default` is the logged-out value.
#[derive(Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub api_key: Option<String>,
    pub service_url: Option<String>,
    /// `None` until plan limits have been loaded; access checks fail open meanwhile.
    pub permissions: Option<PermissionState>,
    pub from_cache: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn tier(&self) -> Tier {
        self.permissions
            .as_ref()
            .map(|p| p.tier)
            .unwrap_or(Tier::Unknown)
    }

    pub fn table(&self) -> Option<&PermissionTable> {
        self.permissions.as_ref().and_then(|p| p.table.as_ref())
    }

    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.permissions.as_ref().and_then(|p| p.rate_limit.as_ref())
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("phase", &self.phase)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("service_url", &self.service_url)
            .field("tier", &self.tier())
            .field("from_cache", &self.from_cache)
            .finish()
    }
}
