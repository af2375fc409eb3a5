use super::SessionServiceState;
use crate::modules::session::{InitOutcome, ResetOptions, SessionStatus};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// An explicit key wins over the stored one and is saved once it authenticates.
pub async fn initialize_session(
    state: &SessionServiceState,
    api_key: Option<String>,
    service_url: Option<String>,
) -> Result<InitOutcome, String> {
    let mut coordinator = state.coordinator.write().await;
    let explicit = non_blank(api_key);
    let api_key = match explicit.clone() {
        Some(key) => key,
        None => coordinator
            .credentials()
            .load()
            .map(|c| c.api_key)
            .ok_or_else(|| "no_api_key: pass one or store a credential first".to_string())?,
    };
    let service_url =
        non_blank(service_url).unwrap_or_else(|| coordinator.config().service_url.clone());

    let outcome = coordinator.initialize(&api_key, &service_url).await?;
    if explicit.is_some() {
        if let Err(e) = coordinator.remember_credential(&api_key) {
            tracing::warn!("Failed to store credential: {}", e);
        }
    }
    Ok(outcome)
}

pub async fn reset_session(
    state: &SessionServiceState,
    options: ResetOptions,
) -> Result<SessionStatus, String> {
    let mut coordinator = state.coordinator.write().await;
    coordinator.reset(options)?;
    Ok(coordinator.status())
}

pub async fn refresh_session(state: &SessionServiceState) -> Result<InitOutcome, String> {
    let mut coordinator = state.coordinator.write().await;
    Ok(coordinator.refresh().await?)
}

pub async fn session_status(state: &SessionServiceState) -> Result<SessionStatus, String> {
    Ok(state.coordinator.read().await.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{service, upstream_app, KEY};
    use crate::models::Tier;
    use crate::test_utils::{spawn_upstream, unique_temp_dir};

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_without_any_credential_fails() {
        let dir = unique_temp_dir("cmd-no-key");
        let state = service(&dir);
        let err = initialize_session(&state, Some("   ".to_string()), None)
            .await
            .expect_err("no key");
        assert!(err.starts_with("no_api_key"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn explicit_key_is_remembered_and_reused() {
        let dir = unique_temp_dir("cmd-remember");
        let (base_url, server) = spawn_upstream(upstream_app()).await;
        let state = service(&dir);

        let outcome = initialize_session(&state, Some(KEY.to_string()), Some(base_url.clone()))
            .await
            .expect("initialize");
        assert_eq!(outcome.tier, Tier::Advanced);

        let status = reset_session(&state, ResetOptions::default())
            .await
            .expect("reset");
        assert!(!status.authenticated);

        let again = initialize_session(&state, None, Some(base_url))
            .await
            .expect("stored key");
        assert!(again.from_cache);

        let status = session_status(&state).await.expect("status");
        assert!(status.authenticated);
        assert_eq!(status.catalog_endpoints, 2);

        let refreshed = refresh_session(&state).await.expect("refresh");
        assert!(!refreshed.from_cache);
        server.abort();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
