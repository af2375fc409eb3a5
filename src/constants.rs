use std::sync::LazyLock;

pub const APP_NAME: &str = "metricgate";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const API_KEY_ENV: &str = "METRICGATE_API_KEY";
pub const API_URL_ENV: &str = "METRICGATE_API_URL";
pub const CACHE_TTL_ENV: &str = "METRICGATE_CACHE_TTL_DAYS";

pub static USER_AGENT: LazyLock<String> = LazyLock::new(|| {
    let agent = format!(
        "{}/{} {}/{}",
        APP_NAME,
        VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    tracing::debug!(user_agent = %agent, "User-Agent initialized");
    agent
});
