use once_cell::sync::Lazy;
use std::time::Duration;

/// Address the HTTP API binds to. Defaults to `0.0.0.0:8080`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()));

/// Validation job timeout. Defaults to 5 minutes (spec.md §4.2).
pub static VALIDATION_TIMEOUT: Lazy<Duration> =
    Lazy::new(|| duration_from_env_secs("VALIDATION_TIMEOUT_SECS", 5 * 60));

/// Change-staging job timeout. Defaults to 30 minutes (spec.md §4.2).
pub static CHANGE_STAGING_TIMEOUT: Lazy<Duration> =
    Lazy::new(|| duration_from_env_secs("CHANGE_STAGING_TIMEOUT_SECS", 30 * 60));

/// Deploy/destroy job timeout. Defaults to 10 minutes (spec.md §4.2 says
/// "around 10 min for tests; production value per config").
pub static DEPLOYMENT_TIMEOUT: Lazy<Duration> =
    Lazy::new(|| duration_from_env_secs("DEPLOYMENT_TIMEOUT_SECS", 10 * 60));

/// Cleanup jobs' internal timeout. Fixed at 10 minutes (spec.md §4.1, §5).
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10 * 60);

fn duration_from_env_secs(var: &str, default_secs: u64) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}
