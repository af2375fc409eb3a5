pub mod commands;
pub mod constants;
pub mod error;
pub mod models;
pub mod modules;
pub mod upstream;
mod utils;

#[cfg(test)]
mod test_utils;

use commands::SessionServiceState;
use constants::{API_KEY_ENV, API_URL_ENV, CACHE_TTL_ENV};
use modules::session::{ResetOptions, SessionCoordinator};
use modules::system::logger;
use tracing::{error, info, warn};

const LOG_RETENTION_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliAction {
    Status,
    Refresh,
    Logout,
}

fn parse_action(args: &[String]) -> CliAction {
    if args.iter().any(|arg| arg == "--logout") {
        CliAction::Logout
    } else if args.iter().any(|arg| arg == "--refresh") {
        CliAction::Refresh
    } else {
        CliAction::Status
    }
}

fn apply_env_overrides(config: &mut models::AppConfig) {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            info!("Using API key from environment");
            config.api_key = Some(key.trim().to_string());
        }
    }

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            info!("Using service URL from environment: {}", url.trim());
            config.service_url = url.trim().to_string();
        }
    }

    if let Ok(ttl) = std::env::var(CACHE_TTL_ENV) {
        match ttl.trim().parse::<u32>() {
            Ok(days) => {
                config.cache_ttl_days = days;
                info!("Using cache TTL from environment: {} days", days);
            }
            Err(_) => warn!("Ignoring invalid cache TTL value: {}", ttl),
        }
    }
}

async fn run_action(action: CliAction) -> Result<String, String> {
    let mut config = modules::system::config::load_app_config()
        .map_err(|e| format!("failed_to_load_config: {}", e))?;

    apply_env_overrides(&mut config);
    modules::system::validation::validate_app_config(&config).map_err(|errors| {
        format!(
            "configuration_validation_failed:\n{}",
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        )
    })?;
    info!(
        "Using service {} (TLS backend: {})",
        config.service_url,
        utils::http::tls_backend_name()
    );

    let api_key = config.api_key.clone();
    let state = SessionServiceState::new(SessionCoordinator::from_config(config)?);

    let status = match action {
        CliAction::Logout => {
            commands::session::reset_session(
                &state,
                ResetOptions {
                    clear_credential: true,
                    clear_cache: true,
                },
            )
            .await?
        }
        CliAction::Refresh | CliAction::Status => {
            commands::session::initialize_session(&state, api_key, None).await?;
            if action == CliAction::Refresh {
                commands::session::refresh_session(&state).await?;
            }
            commands::session::session_status(&state).await?
        }
    };

    serde_json::to_string_pretty(&status).map_err(|e| format!("failed_to_render_status: {}", e))
}

pub fn run() {
    logger::init_logger(LOG_RETENTION_DAYS);

    let args: Vec<String> = std::env::args().collect();
    let action = parse_action(&args);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(async {
        match run_action(action).await {
            Ok(status) => println!("{}", status),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{lock_env, ScopedEnvVar};

    #[test]
    fn env_overrides_apply_trimmed_values() {
        let _guard = lock_env();
        let _key = ScopedEnvVar::set(API_KEY_ENV, "  env-key-123  ");
        let _url = ScopedEnvVar::set(API_URL_ENV, "http://localhost:9100 ");
        let _ttl = ScopedEnvVar::set(CACHE_TTL_ENV, "3");

        let mut config = models::AppConfig::new();
        apply_env_overrides(&mut config);
        assert_eq!(config.api_key.as_deref(), Some("env-key-123"));
        assert_eq!(config.service_url, "http://localhost:9100");
        assert_eq!(config.cache_ttl_days, 3);
    }

    #[test]
    fn invalid_or_blank_env_values_are_ignored() {
        let _guard = lock_env();
        let _key = ScopedEnvVar::set(API_KEY_ENV, "   ");
        let _url = ScopedEnvVar::unset(API_URL_ENV);
        let _ttl = ScopedEnvVar::set(CACHE_TTL_ENV, "seven");

        let mut config = models::AppConfig::new();
        apply_env_overrides(&mut config);
        assert!(config.api_key.is_none());
        assert_eq!(config.service_url, models::config::DEFAULT_SERVICE_URL);
        assert_eq!(
            config.cache_ttl_days,
            models::config::DEFAULT_CACHE_TTL_DAYS
        );
    }

    #[test]
    fn logout_flag_wins_over_refresh() {
        let args = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(parse_action(&args(&["metricgate"])), CliAction::Status);
        assert_eq!(
            parse_action(&args(&["metricgate", "--refresh"])),
            CliAction::Refresh
        );
        assert_eq!(
            parse_action(&args(&["metricgate", "--refresh", "--logout"])),
            CliAction::Logout
        );
    }
}
