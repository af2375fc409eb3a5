pub mod endpoints;
pub mod session;

use crate::modules::session::SessionCoordinator;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle the command functions operate on.
#[derive(Clone)]
pub struct SessionServiceState {
    pub coordinator: Arc<RwLock<SessionCoordinator>>,
}

impl SessionServiceState {
    pub fn new(coordinator: SessionCoordinator) -> Self {
        Self {
            coordinator: Arc::new(RwLock::new(coordinator)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SessionServiceState;
    use crate::models::AppConfig;
    use crate::modules::auth::CredentialStore;
    use crate::modules::persistence::CacheStore;
    use crate::modules::session::SessionCoordinator;
    use axum::{routing::get, Json, Router};
    use serde_json::json;
    use std::path::Path;

    pub const KEY: &str = "cmd-key-12345678";
    pub const PRICE: &str = "/v1/btc/market/price_usd_close";
    pub const ETH_PRICE: &str = "/v1/eth/market/price_usd_close";

    pub fn service(dir: &Path) -> SessionServiceState {
        SessionServiceState::new(SessionCoordinator::new(
            AppConfig::new(),
            CacheStore::new(dir, 7),
            CredentialStore::new(dir),
        ))
    }

    pub fn upstream_app() -> Router {
        Router::new()
            .route(
                "/v1/metadata/endpoints",
                get(|| async {
                    Json(json!({"status": 200, "message": "ok", "data": [
                        {"path": PRICE, "parameters": {"a": ["BTC"]}, "required_parameters": ["a"]},
                        {"path": ETH_PRICE}
                    ]}))
                }),
            )
            .route(
                "/v1/user/plan-limits",
                get(|| async {
                    Json(json!({
                        "plan": "Advanced",
                        "btc": {"market": {"price_usd_close": {"24h": "3y", "1h": "1m"}}}
                    }))
                }),
            )
            .route(PRICE, get(|| async { Json(json!([{"t": 1, "v": 1.5}])) }))
    }
}
