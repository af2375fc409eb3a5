//! Owns the single live session: cache-first initialization, reset, and query gating.
//!
//! All mutation goes through `&mut self`, so one coordinator never has two
//! initializations in flight. Read paths (search, access checks) borrow the state.

use crate::error::{AppError, AppResult};
use crate::models::{
    AppConfig, CacheRecord, EndpointQuery, IndexedEndpoint, ParameterValidation, PermissionState,
    PermissionSummary, RateLimit, SessionPhase, SessionState, Tier,
};
use crate::modules::auth::CredentialStore;
use crate::modules::catalog::{validate_parameters, EndpointCatalog};
use crate::modules::limits::{
    has_endpoint_access, parse_plan_limits, required_plan, resolve_tier, validate_date_range,
    DateRangeCheck,
};
use crate::modules::persistence::{credential_prefix, CacheStore};
use crate::modules::summary::build_summary;
use crate::upstream::{MetricsApiClient, PlanLimitsFetch};
use crate::utils::http::client_for_config;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitOutcome {
    pub tier: Tier,
    pub from_cache: bool,
    pub catalog_endpoints: usize,
    /// False when the plan-limits call failed and access checks fail open.
    pub limits_loaded: bool,
    pub cache_written: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOptions {
    #[serde(default)]
    pub clear_credential: bool,
    #[serde(default)]
    pub clear_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub authenticated: bool,
    pub tier: Tier,
    pub from_cache: bool,
    pub service_url: Option<String>,
    pub catalog_endpoints: usize,
    pub catalog_fetched_at: Option<DateTime<Utc>>,
    pub permitted_endpoints: usize,
    pub static_endpoints: usize,
    pub rate_limit: Option<RateLimit>,
    pub permissions_loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryAuthorization {
    Allowed,
    NotAuthenticated,
    AccessDenied { tier: Tier, required_plan: Tier },
    UnknownEndpoint { path: String },
    InvalidParameters { validation: ParameterValidation },
    DateOutOfRange { check: DateRangeCheck },
}

impl QueryAuthorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::NotAuthenticated => Some("No active session; initialize first".to_string()),
            Self::AccessDenied {
                tier,
                required_plan,
            } => Some(format!(
                "Endpoint not available on the {} tier; upgrade to {} or higher",
                tier, required_plan
            )),
            Self::UnknownEndpoint { path } => Some(format!("Unknown endpoint: {}", path)),
            Self::InvalidParameters { validation } => Some(validation.errors().join("; ")),
            Self::DateOutOfRange { check } => check.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Data { path: String, data: Value },
    Rejected { authorization: QueryAuthorization },
}

pub struct SessionCoordinator {
    config: AppConfig,
    http: Client,
    cache: CacheStore,
    credentials: CredentialStore,
    state: SessionState,
    catalog: Option<EndpointCatalog>,
    summary: Option<PermissionSummary>,
}

impl SessionCoordinator {
    pub fn new(config: AppConfig, cache: CacheStore, credentials: CredentialStore) -> Self {
        let http = client_for_config(&config);
        Self {
            config,
            http,
            cache,
            credentials,
            state: SessionState::default(),
            catalog: None,
            summary: None,
        }
    }

    /// Stores rooted in the data directory.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let cache = CacheStore::from_data_dir(config.cache_ttl_days)?;
        let credentials = CredentialStore::from_data_dir()?;
        Ok(Self::new(config, cache, credentials))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn catalog(&self) -> Option<&EndpointCatalog> {
        self.catalog.as_ref()
    }

    pub fn summary(&self) -> Option<&PermissionSummary> {
        self.summary.as_ref()
    }

    fn client_for(&self, service_url: &str) -> MetricsApiClient {
        MetricsApiClient::from_config(self.http.clone(), &self.config, service_url)
    }

    fn clear_session(&mut self) {
        self.state = SessionState::default();
        self.catalog = None;
        self.summary = None;
    }

    pub async fn initialize(&mut self, api_key: &str, service_url: &str) -> AppResult<InitOutcome> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::Credential("api_key_must_not_be_empty".to_string()));
        }
        let service_url = service_url.trim().trim_end_matches('/');
        if service_url.is_empty() {
            return Err(AppError::Config("service_url_must_not_be_empty".to_string()));
        }

        self.clear_session();
        self.state = SessionState {
            phase: SessionPhase::Authenticating,
            api_key: Some(api_key.to_string()),
            service_url: Some(service_url.to_string()),
            ..SessionState::default()
        };

        let client = self.client_for(service_url);
        let prefix = credential_prefix(api_key);
        let result = match self.cache.read(service_url) {
            Some(record) if self.cache.is_valid(&record, service_url, &prefix, Utc::now()) => {
                Ok(self.initialize_from_cache(&client, api_key, record).await)
            }
            Some(_) => {
                // A rejected record must not outlive a fetch that writes nothing.
                if let Err(e) = self.cache.invalidate(service_url) {
                    tracing::warn!("Failed to remove rejected permission cache: {}", e);
                }
                self.initialize_fresh(&client, api_key, service_url).await
            }
            None => self.initialize_fresh(&client, api_key, service_url).await,
        };

        match result {
            Ok(outcome) => {
                self.state.phase = SessionPhase::Authenticated;
                self.state.from_cache = outcome.from_cache;
                if let Err(e) = self.credentials.touch_validated(api_key) {
                    tracing::warn!("Failed to record credential validation: {}", e);
                }
                tracing::info!(
                    tier = %outcome.tier,
                    from_cache = outcome.from_cache,
                    endpoints = outcome.catalog_endpoints,
                    "Session initialized"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.clear_session();
                tracing::error!("Session initialization failed: {}", e);
                Err(e)
            }
        }
    }

    async fn initialize_from_cache(
        &mut self,
        client: &MetricsApiClient,
        api_key: &str,
        record: CacheRecord,
    ) -> InitOutcome {
        let tier = record.metadata.tier;
        let mut permissions = PermissionState::from_parsed(record.parsed, tier);
        permissions.loaded_at = record.metadata.cached_at;

        // Parameter metadata is not cached; a failed refresh leaves search empty.
        match client.fetch_endpoints(api_key).await {
            Ok(descriptors) => self.catalog = Some(EndpointCatalog::parse(descriptors)),
            Err(e) => tracing::warn!(
                "Endpoint catalog fetch failed, keeping cached permissions: {}",
                e
            ),
        }

        self.state.permissions = Some(permissions);
        self.summary = Some(record.summary);
        InitOutcome {
            tier,
            from_cache: true,
            catalog_endpoints: self.catalog.as_ref().map_or(0, EndpointCatalog::len),
            limits_loaded: true,
            cache_written: false,
        }
    }

    async fn initialize_fresh(
        &mut self,
        client: &MetricsApiClient,
        api_key: &str,
        service_url: &str,
    ) -> AppResult<InitOutcome> {
        let catalog = EndpointCatalog::parse(client.fetch_endpoints(api_key).await?);
        let catalog_endpoints = catalog.len();
        self.catalog = Some(catalog);

        let mut cache_written = false;
        let permissions = match client.fetch_plan_limits(api_key).await {
            Ok(PlanLimitsFetch::Restricted(_)) => Some(PermissionState::restricted_basic()),
            Ok(PlanLimitsFetch::Payload(raw)) => {
                let parsed = parse_plan_limits(&raw);
                let tier = resolve_tier(&parsed);
                if parsed.table.is_some() {
                    let summary = build_summary(parsed.table.as_ref(), &parsed.statics, tier);
                    let record = self.cache.build_record(
                        service_url,
                        api_key,
                        raw,
                        parsed.clone(),
                        summary,
                        tier,
                        Utc::now(),
                    );
                    match self.cache.write(&record) {
                        Ok(_) => cache_written = true,
                        Err(e) => tracing::warn!("Failed to persist permission cache: {}", e),
                    }
                } else {
                    tracing::warn!("Plan limits payload carried no usable limits, not caching");
                }
                Some(PermissionState::from_parsed(parsed, tier))
            }
            Err(e) => {
                tracing::warn!("Plan limits fetch failed, continuing without tier data: {}", e);
                None
            }
        };

        let tier = permissions.as_ref().map_or(Tier::Unknown, |p| p.tier);
        self.summary = permissions
            .as_ref()
            .map(|p| build_summary(p.table.as_ref(), &p.statics, p.tier));
        let limits_loaded = permissions.is_some();
        self.state.permissions = permissions;

        Ok(InitOutcome {
            tier,
            from_cache: false,
            catalog_endpoints,
            limits_loaded,
            cache_written,
        })
    }

    /// Saves `api_key` as the stored credential and marks it validated.
    pub fn remember_credential(&self, api_key: &str) -> AppResult<()> {
        self.credentials.save(api_key)?;
        self.credentials.touch_validated(api_key.trim())?;
        Ok(())
    }

    pub fn reset(&mut self, options: ResetOptions) -> AppResult<()> {
        self.clear_session();
        if options.clear_cache {
            self.cache.clear_all()?;
        }
        if options.clear_credential {
            self.credentials.clear()?;
        }
        tracing::info!(
            clear_cache = options.clear_cache,
            clear_credential = options.clear_credential,
            "Session reset"
        );
        Ok(())
    }

    /// Drops the cached permissions for the current service and initializes again.
    pub async fn refresh(&mut self) -> AppResult<InitOutcome> {
        let (Some(api_key), Some(service_url)) =
            (self.state.api_key.clone(), self.state.service_url.clone())
        else {
            return Err(AppError::Session("no_active_session".to_string()));
        };
        self.cache.invalidate(&service_url)?;
        self.initialize(&api_key, &service_url).await
    }

    pub fn status(&self) -> SessionStatus {
        let permissions = self.state.permissions.as_ref();
        SessionStatus {
            phase: self.state.phase,
            authenticated: self.state.is_authenticated(),
            tier: self.state.tier(),
            from_cache: self.state.from_cache,
            service_url: self.state.service_url.clone(),
            catalog_endpoints: self.catalog.as_ref().map_or(0, EndpointCatalog::len),
            catalog_fetched_at: self.catalog.as_ref().map(EndpointCatalog::fetched_at),
            permitted_endpoints: self.summary.as_ref().map_or(0, |s| s.total_endpoints),
            static_endpoints: permissions.map_or(0, |p| p.statics.len()),
            rate_limit: self.state.rate_limit().cloned(),
            permissions_loaded_at: permissions.map(|p| p.loaded_at),
        }
    }

    pub fn search(&self, query: &EndpointQuery) -> Vec<&IndexedEndpoint> {
        self.catalog
            .as_ref()
            .map(|catalog| catalog.search(query))
            .unwrap_or_default()
    }

    pub fn lookup(&self, path: &str) -> Option<&IndexedEndpoint> {
        self.catalog.as_ref()?.lookup_by_path(path)
    }

    pub fn authorize_query(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
        from: Option<NaiveDate>,
        window: Option<&str>,
    ) -> QueryAuthorization {
        if !self.state.is_authenticated() {
            return QueryAuthorization::NotAuthenticated;
        }
        if !has_endpoint_access(&self.state, path) {
            return QueryAuthorization::AccessDenied {
                tier: self.state.tier(),
                required_plan: required_plan(&self.state, path),
            };
        }

        let is_static = self
            .state
            .permissions
            .as_ref()
            .is_some_and(|p| p.is_static(path));
        if let Some(catalog) = self.catalog.as_ref() {
            match catalog.lookup_by_path(path) {
                Some(endpoint) => {
                    let validation = validate_parameters(endpoint, params);
                    if !validation.valid {
                        return QueryAuthorization::InvalidParameters { validation };
                    }
                }
                None if !is_static => {
                    return QueryAuthorization::UnknownEndpoint {
                        path: path.to_string(),
                    }
                }
                None => {}
            }
        }

        let check = validate_date_range(&self.state, path, from, window);
        if !check.is_valid() {
            return QueryAuthorization::DateOutOfRange { check };
        }
        QueryAuthorization::Allowed
    }

    /// Gated pass-through GET; the upstream body is returned untouched.
    pub async fn execute_query(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
        from: Option<NaiveDate>,
        window: Option<&str>,
    ) -> AppResult<QueryOutcome> {
        let authorization = self.authorize_query(path, params, from, window);
        if !authorization.is_allowed() {
            tracing::info!(path = %path, "Query rejected: {:?}", authorization.message());
            return Ok(QueryOutcome::Rejected { authorization });
        }
        let (Some(api_key), Some(service_url)) =
            (self.state.api_key.as_deref(), self.state.service_url.as_deref())
        else {
            return Err(AppError::Session("no_active_session".to_string()));
        };
        let data = self
            .client_for(service_url)
            .fetch_metric(api_key, path, params)
            .await?;
        Ok(QueryOutcome::Data {
            path: path.to_string(),
            data,
        })
    }
}
