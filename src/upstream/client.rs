// Upstream metrics API client.
// Two discovery calls feed the session (endpoint catalog, plan limits); data queries are
// forwarded untouched. No retries: a failed call fails the operation that issued it.

use crate::error::{AppError, AppResult};
use crate::models::{AppConfig, EndpointDescriptor};
use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of the plan-limits call. 403 and 500 mean "restricted account", not failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanLimitsFetch {
    Payload(Value),
    Restricted(StatusCode),
}

#[derive(Debug, Clone)]
pub struct MetricsApiClient {
    http: Client,
    base_url: String,
    endpoints_path: String,
    limits_path: String,
}

impl MetricsApiClient {
    pub fn new(
        http: Client,
        base_url: &str,
        endpoints_path: impl Into<String>,
        limits_path: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            endpoints_path: endpoints_path.into(),
            limits_path: limits_path.into(),
        }
    }

    pub fn from_config(http: Client, config: &AppConfig, service_url: &str) -> Self {
        Self::new(
            http,
            service_url,
            config.endpoints_path.clone(),
            config.limits_path.clone(),
        )
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn get(&self, path: &str, api_key: &str) -> AppResult<Response> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Upstream GET");
        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(response)
    }

    async fn read_json(response: Response) -> AppResult<Value> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(AppError::from)
    }

    async fn error_for_status(response: Response, what: &str) -> AppError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let snippet: String = text.chars().take(200).collect();
        AppError::Upstream(format!("{} returned HTTP {} - {}", what, status, snippet))
    }

    pub async fn fetch_endpoints(&self, api_key: &str) -> AppResult<Vec<EndpointDescriptor>> {
        let response = self.get(&self.endpoints_path, api_key).await?;
        if !response.status().is_success() {
            return Err(Self::error_for_status(response, "endpoint discovery").await);
        }
        let body = Self::read_json(response).await?;
        parse_endpoint_envelope(body)
    }

    pub async fn fetch_plan_limits(&self, api_key: &str) -> AppResult<PlanLimitsFetch> {
        let response = self.get(&self.limits_path, api_key).await?;
        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::warn!(
                status = %status,
                "Plan limits unavailable for this account, treating as restricted basic tier"
            );
            return Ok(PlanLimitsFetch::Restricted(status));
        }
        if !status.is_success() {
            return Err(Self::error_for_status(response, "plan limits").await);
        }
        Ok(PlanLimitsFetch::Payload(Self::read_json(response).await?))
    }

    /// Forwards a data query; the body is returned as received.
    pub async fn fetch_metric(
        &self,
        api_key: &str,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> AppResult<Value> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .query(params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for_status(response, path).await);
        }
        Self::read_json(response).await
    }
}

/// Accepts `{status, message, data: [...]}` or a bare array. Entries that do not
/// deserialize are skipped.
pub fn parse_endpoint_envelope(body: Value) -> AppResult<Vec<EndpointDescriptor>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => {
            if let Some(status) = envelope.get("status").and_then(Value::as_u64) {
                if status != 200 {
                    let message = envelope
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("no message");
                    return Err(AppError::Upstream(format!(
                        "endpoint discovery status {}: {}",
                        status, message
                    )));
                }
            }
            match envelope.remove("data") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(AppError::Upstream(
                        "endpoint discovery response has no data list".to_string(),
                    ))
                }
            }
        }
        _ => {
            return Err(AppError::Upstream(
                "endpoint discovery response is not an object or list".to_string(),
            ))
        }
    };

    let total = items.len();
    let descriptors: Vec<EndpointDescriptor> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if descriptors.len() < total {
        tracing::warn!(
            skipped = total - descriptors.len(),
            "Skipped endpoint descriptors that failed to parse"
        );
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::spawn_upstream;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    fn client(base_url: &str) -> MetricsApiClient {
        MetricsApiClient::new(Client::new(), base_url, "/v1/endpoints", "/v1/limits")
    }

    #[test]
    fn envelope_and_bare_list_are_accepted() {
        let envelope = json!({
            "status": 200,
            "message": "ok",
            "data": [
                {"path": "/v1/btc/market/price", "parameters": {"i": ["24h"]}, "required": ["i"]},
                {"no_path": true}
            ]
        });
        let parsed = parse_endpoint_envelope(envelope).expect("envelope");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].required_parameters, vec!["i"]);

        let bare = parse_endpoint_envelope(json!([{"path": "/v1/eth/market/price"}]))
            .expect("bare list");
        assert_eq!(bare[0].path, "/v1/eth/market/price");
        assert!(bare[0].parameters.is_empty());
    }

    #[test]
    fn envelope_errors_are_hard_failures() {
        assert!(parse_endpoint_envelope(json!({"status": 401, "message": "bad key"})).is_err());
        assert!(parse_endpoint_envelope(json!({"status": 200, "data": {}})).is_err());
        assert!(parse_endpoint_envelope(json!("nope")).is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetches_send_bearer_token() {
        let app = Router::new().route(
            "/v1/endpoints",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer key-1234" {
                    return (AxumStatus::UNAUTHORIZED, Json(json!({"status": 401})));
                }
                (
                    AxumStatus::OK,
                    Json(json!({"status": 200, "message": "ok", "data": [{"path": "/v1/btc/a/b"}]})),
                )
            }),
        );
        let (base_url, server) = spawn_upstream(app).await;
        let api = client(&base_url);

        let endpoints = api.fetch_endpoints("key-1234").await.expect("fetch");
        assert_eq!(endpoints.len(), 1);
        let err = api.fetch_endpoints("wrong").await.expect_err("unauthorized");
        assert!(err.to_string().contains("401"));
        server.abort();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn plan_limits_forbidden_and_server_error_are_restricted() {
        let app = Router::new()
            .route(
                "/v1/limits",
                get(|| async { (AxumStatus::FORBIDDEN, "forbidden") }),
            )
            .route(
                "/v2/limits",
                get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/v3/limits", get(|| async { (AxumStatus::BAD_GATEWAY, "bad") }));
        let (base_url, server) = spawn_upstream(app).await;

        let forbidden = client(&base_url).fetch_plan_limits("k").await.expect("403");
        assert_eq!(forbidden, PlanLimitsFetch::Restricted(StatusCode::FORBIDDEN));

        let api = MetricsApiClient::new(Client::new(), &base_url, "/x", "/v2/limits");
        assert_eq!(
            api.fetch_plan_limits("k").await.expect("500"),
            PlanLimitsFetch::Restricted(StatusCode::INTERNAL_SERVER_ERROR)
        );

        let api = MetricsApiClient::new(Client::new(), &base_url, "/x", "/v3/limits");
        assert!(api.fetch_plan_limits("k").await.is_err());
        server.abort();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn metric_query_forwards_parameters() {
        let app = Router::new().route(
            "/v1/btc/market/price",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({"echo": params}))
            }),
        );
        let (base_url, server) = spawn_upstream(app).await;

        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "BTC".to_string());
        params.insert("i".to_string(), "24h".to_string());
        let body = client(&base_url)
            .fetch_metric("k", "/v1/btc/market/price", &params)
            .await
            .expect("query");
        server.abort();

        assert_eq!(body["echo"]["a"], "BTC");
        assert_eq!(body["echo"]["i"], "24h");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn transport_failure_is_network_error() {
        let api = client("http://127.0.0.1:9");
        let err = api.fetch_endpoints("k").await.expect_err("connection refused");
        assert!(matches!(err, AppError::Network(_)));
    }
}
