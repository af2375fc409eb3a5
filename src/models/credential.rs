use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub api_key: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<DateTime<Utc>>,
}

impl StoredCredential {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            created_at: Utc::now(),
            last_validated: None,
        }
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("api_key", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("last_validated", &self.last_validated)
            .finish()
    }
}
