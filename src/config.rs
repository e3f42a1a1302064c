use clap::Args;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECONNECT_INITIAL_MS: u64 = 500;
pub const DEFAULT_RECONNECT_MAX_SECS: u64 = 30;

/// Externally supplied settings, read from flags or the environment.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the ride API (estimate, checkout and realtime channel).
    #[arg(long, global = true, env = "RIDEQUEST_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Mapping-service key used for geocoding. Empty disables geocoding.
    #[arg(
        long,
        global = true,
        env = "RIDEQUEST_MAPS_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub maps_key: String,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, global = true, env = "RIDEQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// First delay before reconnecting the realtime channel, in milliseconds.
    #[arg(
        long,
        global = true,
        env = "RIDEQUEST_RECONNECT_INITIAL_MS",
        default_value_t = DEFAULT_RECONNECT_INITIAL_MS
    )]
    pub reconnect_initial_ms: u64,

    /// Upper bound for the realtime reconnect delay, in seconds.
    #[arg(
        long,
        global = true,
        env = "RIDEQUEST_RECONNECT_MAX_SECS",
        default_value_t = DEFAULT_RECONNECT_MAX_SECS
    )]
    pub reconnect_max_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            maps_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            reconnect_initial_ms: DEFAULT_RECONNECT_INITIAL_MS,
            reconnect_max_secs: DEFAULT_RECONNECT_MAX_SECS,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Doubling backoff between the configured bounds.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect_initial_ms),
            max_delay: Duration::from_secs(self.reconnect_max_secs),
            ..ReconnectPolicy::default()
        }
    }

    pub fn maps_key(&self) -> Option<&str> {
        let key = self.maps_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

/// Exponential backoff between realtime reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given (zero-based) retry, capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(32) as i32);
        self.initial_delay
            .mul_f64(factor)
            .min(self.max_delay)
    }
}
