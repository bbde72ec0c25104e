//! Configuration types for toprated

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Remote API and connection pool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint queried for every page (default: the public food outlets mock API)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Query parameter carrying the query key (default: "city")
    #[serde(default = "default_key_param")]
    pub key_param: String,

    /// Query parameter carrying the 1-based page number (default: "page")
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Hard cap on simultaneous in-flight requests, shared by every fetch (default: 10)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Timeout for a single request attempt, including reading the body (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// Timeout for establishing a connection (default: 10s)
    #[serde(default = "default_connect_timeout", with = "duration_ms_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key_param: default_key_param(),
            page_param: default_page_param(),
            max_connections: default_max_connections(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry behavior configuration
///
/// The wait before the next attempt is `initial_delay * backoff_multiplier^attempt`,
/// capped at `max_delay`, where `attempt` counts the attempts already made. A 429 carrying
/// `Retry-After` overrides the computed value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per page, first attempt included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay of the exponential backoff (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between attempts (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration
///
/// Every field has a default, so `Config::default()` talks to the public endpoint and
/// a JSON file only needs to mention what it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry settings applied to each page fetch
    #[serde(default)]
    pub retry: RetryConfig,

    /// Query settings used when the caller does not pass its own
    #[serde(default)]
    pub query: QueryConfig,
}

/// Defaults for the query issued by the entry point
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Query key used when none is given (default: "denver")
    #[serde(default = "default_key")]
    pub default_key: String,

    /// Maximum number of names returned (default: 5)
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_key: default_key(),
            default_limit: default_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Fields missing from the file keep their defaults. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("invalid config file '{}': {}", path.display(), e),
            key: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        let api = &self.api;
        match url::Url::parse(&api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(config_error(
                    format!("unsupported URL scheme '{}'", url.scheme()),
                    "api.base_url",
                ));
            }
            Err(e) => {
                return Err(config_error(
                    format!("invalid base URL '{}': {}", api.base_url, e),
                    "api.base_url",
                ));
            }
        }
        if api.key_param.trim().is_empty() {
            return Err(config_error("must not be empty", "api.key_param"));
        }
        if api.page_param.trim().is_empty() {
            return Err(config_error("must not be empty", "api.page_param"));
        }
        if api.max_connections == 0 {
            return Err(config_error("must be at least 1", "api.max_connections"));
        }
        if api.request_timeout.is_zero() {
            return Err(config_error("must be greater than zero", "api.request_timeout"));
        }
        if api.connect_timeout.is_zero() {
            return Err(config_error("must be greater than zero", "api.connect_timeout"));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(config_error("must be at least 1", "retry.max_attempts"));
        }
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                format!(
                    "must be a finite number >= 1.0, got {}",
                    retry.backoff_multiplier
                ),
                "retry.backoff_multiplier",
            ));
        }
        if retry.max_delay < retry.initial_delay {
            return Err(config_error(
                "must not be smaller than retry.initial_delay",
                "retry.max_delay",
            ));
        }

        if self.query.default_key.trim().is_empty() {
            return Err(config_error("must not be empty", "query.default_key"));
        }
        if self.query.default_limit == 0 {
            return Err(config_error("must be at least 1", "query.default_limit"));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: format!("{key}: {}", message.into()),
        key: Some(key.to_string()),
    }
}

fn default_base_url() -> String {
    "https://jsonmock.hackerrank.com/api/food_outlets".to_string()
}

fn default_key_param() -> String {
    "city".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    concat!("toprated/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_key() -> String {
    "denver".to_string()
}

fn default_limit() -> usize {
    5
}

// Durations are written as whole milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
