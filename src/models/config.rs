use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE_URL: &str = "https://api.metrics.example.com";
pub const DEFAULT_ENDPOINTS_PATH: &str = "/v1/metadata/endpoints";
pub const DEFAULT_LIMITS_PATH: &str = "/v1/user/plan-limits";
pub const DEFAULT_CACHE_TTL_DAYS: u32 = 7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default = "default_endpoints_path")]
    pub endpoints_path: String,
    #[serde(default = "default_limits_path")]
    pub limits_path: String,
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,
    /// Never persisted; filled from the environment at startup.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamProxyConfig {
    pub enabled: bool,
    pub url: String,
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_endpoints_path() -> String {
    DEFAULT_ENDPOINTS_PATH.to_string()
}

fn default_limits_path() -> String {
    DEFAULT_LIMITS_PATH.to_string()
}

fn default_cache_ttl_days() -> u32 {
    DEFAULT_CACHE_TTL_DAYS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            service_url: default_service_url(),
            endpoints_path: default_endpoints_path(),
            limits_path: default_limits_path(),
            cache_ttl_days: default_cache_ttl_days(),
            request_timeout_secs: default_request_timeout(),
            upstream_proxy: UpstreamProxyConfig::default(),
            api_key: None,
        }
    }

    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = service_url.into();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
