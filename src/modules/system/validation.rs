use crate::models::{AppConfig, UpstreamProxyConfig};
use std::fmt;

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
    pub actual_value: Option<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual_value {
            Some(val) => write!(f, "  • {}: {} (got: {})", self.field, self.message, val),
            None => write!(f, "  • {}: {}", self.field, self.message),
        }
    }
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: None,
        }
    }

    fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: Some(value.to_string()),
        }
    }
}

pub fn validate_app_config(config: &AppConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !is_valid_service_url(&config.service_url) {
        errors.push(ConfigError::with_value(
            "service_url",
            "must be an absolute http(s) URL",
            &config.service_url,
        ));
    }
    validate_api_path("endpoints_path", &config.endpoints_path, &mut errors);
    validate_api_path("limits_path", &config.limits_path, &mut errors);

    if config.cache_ttl_days == 0 || config.cache_ttl_days > 365 {
        errors.push(ConfigError::with_value(
            "cache_ttl_days",
            "must be between 1 and 365",
            config.cache_ttl_days,
        ));
    }
    if config.request_timeout_secs == 0 {
        errors.push(ConfigError::with_value(
            "request_timeout_secs",
            "must be greater than 0",
            config.request_timeout_secs,
        ));
    } else if config.request_timeout_secs > 600 {
        errors.push(ConfigError::with_value(
            "request_timeout_secs",
            "should not exceed 600 seconds (10 minutes)",
            config.request_timeout_secs,
        ));
    }
    if let Some(key) = config.api_key.as_deref() {
        if key.trim().is_empty() {
            errors.push(ConfigError::new("api_key", "must not be blank when set"));
        }
    }
    validate_upstream_proxy(&config.upstream_proxy, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_api_path(field: &str, path: &str, errors: &mut Vec<ConfigError>) {
    if !path.starts_with('/') || path.contains(char::is_whitespace) {
        errors.push(ConfigError::with_value(
            field,
            "must be an absolute path starting with '/'",
            path,
        ));
    }
}

fn validate_upstream_proxy(config: &UpstreamProxyConfig, errors: &mut Vec<ConfigError>) {
    if !config.enabled {
        return;
    }
    if config.url.trim().is_empty() {
        errors.push(ConfigError::new(
            "upstream_proxy.url",
            "must not be empty when the upstream proxy is enabled",
        ));
    } else if !is_valid_proxy_url(&config.url) {
        errors.push(ConfigError::with_value(
            "upstream_proxy.url",
            "must be a valid proxy URL (http://, https://, or socks5://)",
            &config.url,
        ));
    }
}

fn is_valid_service_url(raw: &str) -> bool {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

fn is_valid_proxy_url(url: &str) -> bool {
    let url_lower = url.to_lowercase();
    (url_lower.starts_with("http://")
        || url_lower.starts_with("https://")
        || url_lower.starts_with("socks5://"))
        && url::Url::parse(url).is_ok()
}
