use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Wait between two scheduled refreshes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);
/// Upper bound for a single remote read
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CATALOG_PATH: &str = "catalog/router_keys.json";
pub const DEFAULT_DEVICE_ID: &str = "testdev01";
pub const DEFAULT_SETUP_RETRIES: u32 = 3;

/// Timing of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub update_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Everything the binary needs to manage one router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub router_url: String,
    pub catalog_path: PathBuf,
    pub device_id: String,
    pub poll: PollSettings,
    pub setup_retries: u32,
}

impl Settings {
    /// Reads the settings from `EASYBOX_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            router_url: lookup("EASYBOX_URL").unwrap_or_default(),
            catalog_path: non_empty("EASYBOX_CATALOG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH)),
            device_id: non_empty("EASYBOX_DEVICE_ID")
                .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string()),
            poll: PollSettings {
                update_interval: parse_secs_safe(
                    lookup("EASYBOX_POLL_INTERVAL_SECS"),
                    DEFAULT_POLL_INTERVAL,
                ),
                fetch_timeout: parse_secs_safe(
                    lookup("EASYBOX_FETCH_TIMEOUT_SECS"),
                    DEFAULT_FETCH_TIMEOUT,
                ),
            },
            setup_retries: parse_count_safe(lookup("EASYBOX_SETUP_RETRIES"), DEFAULT_SETUP_RETRIES),
        }
    }
}

/// Parses a positive number of seconds, falling back to `default`
fn parse_secs_safe(val: Option<String>, default: Duration) -> Duration {
    match val.unwrap_or_default().trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => default,
    }
}

/// Parses a positive count, falling back to `default`
fn parse_count_safe(val: Option<String>, default: u32) -> u32 {
    match val.unwrap_or_default().trim().parse::<u32>() {
        Ok(count) if count > 0 => count,
        _ => default,
    }
}
