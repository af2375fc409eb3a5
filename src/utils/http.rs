use crate::models::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::models::{AppConfig, UpstreamProxyConfig};
use once_cell::sync::Lazy;
use reqwest::{Client, Proxy};
use std::time::Duration;

#[cfg(not(any(feature = "tls-native", feature = "tls-rustls")))]
compile_error!("one TLS backend feature must be enabled: `tls-native` or `tls-rustls`");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsBackendSelection {
    NativeTls,
    Rustls,
}

pub static SHARED_CLIENT: Lazy<Client> =
    Lazy::new(|| create_base_client(DEFAULT_REQUEST_TIMEOUT_SECS, None));

fn parse_tls_backend_override() -> Option<TlsBackendSelection> {
    let raw = std::env::var("TLS_BACKEND").ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "native" | "native-tls" | "default-tls" => Some(TlsBackendSelection::NativeTls),
        "rustls" => Some(TlsBackendSelection::Rustls),
        _ => None,
    }
}

fn supports_tls_backend(selection: TlsBackendSelection) -> bool {
    match selection {
        TlsBackendSelection::NativeTls => cfg!(feature = "tls-native"),
        TlsBackendSelection::Rustls => cfg!(feature = "tls-rustls"),
    }
}

fn compiled_default_tls_backend() -> TlsBackendSelection {
    if cfg!(feature = "tls-native") {
        TlsBackendSelection::NativeTls
    } else {
        TlsBackendSelection::Rustls
    }
}

fn selected_tls_backend() -> TlsBackendSelection {
    if let Some(requested) = parse_tls_backend_override() {
        if supports_tls_backend(requested) {
            return requested;
        }
        tracing::warn!(
            "TLS_BACKEND requested an unavailable backend for this build; falling back to compiled default"
        );
    }
    compiled_default_tls_backend()
}

fn apply_tls_backend(builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
    match selected_tls_backend() {
        TlsBackendSelection::NativeTls => builder,
        TlsBackendSelection::Rustls => {
            #[cfg(feature = "tls-rustls")]
            {
                builder.use_rustls_tls()
            }
            #[cfg(not(feature = "tls-rustls"))]
            {
                builder
            }
        }
    }
}

pub fn tls_backend_name() -> &'static str {
    match selected_tls_backend() {
        TlsBackendSelection::NativeTls => "native-tls",
        TlsBackendSelection::Rustls => "rustls",
    }
}

fn create_base_client(timeout_secs: u64, upstream_proxy: Option<&UpstreamProxyConfig>) -> Client {
    let mut builder = apply_tls_backend(Client::builder())
        .connect_timeout(Duration::from_secs(timeout_secs.min(20)))
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(crate::constants::USER_AGENT.as_str());

    if let Some(proxy_config) = upstream_proxy {
        if proxy_config.enabled && !proxy_config.url.is_empty() {
            match Proxy::all(&proxy_config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("HTTP client enabled upstream proxy: {}", proxy_config.url);
                }
                Err(e) => {
                    tracing::error!("invalid_proxy_url: {}, error: {}", proxy_config.url, e);
                }
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client, using defaults: {}", e);
        Client::new()
    })
}

/// Default settings share one connection pool; anything else gets its own client.
pub fn client_for_config(config: &AppConfig) -> Client {
    if config.request_timeout_secs == DEFAULT_REQUEST_TIMEOUT_SECS
        && !config.upstream_proxy.enabled
    {
        return get_client();
    }
    create_base_client(config.request_timeout_secs, Some(&config.upstream_proxy))
}

pub fn get_client() -> Client {
    SHARED_CLIENT.clone()
}
