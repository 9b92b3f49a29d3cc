//! API client configuration
//!
//! The client core consumes exactly four inputs from the environment mapping:
//! base URL, timeout, retry count and retry delay. Everything else has a
//! sensible default.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ShopLinkError};
use crate::utils::duration_millis;

/// Deployment environment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Default API settings for this environment.
    #[must_use]
    pub fn api_defaults(self) -> ApiConfig {
        match self {
            Self::Development => ApiConfig {
                base_url: "http://localhost:3000/api".to_string(),
                timeout: Duration::from_secs(10),
                retry_attempts: 3,
                retry_delay: Duration::from_millis(1000),
                max_retry_delay: Duration::from_secs(10),
            },
            Self::Staging => ApiConfig {
                base_url: "https://staging-api.shoplink.app/api".to_string(),
                timeout: Duration::from_secs(15),
                retry_attempts: 3,
                retry_delay: Duration::from_millis(1000),
                max_retry_delay: Duration::from_secs(10),
            },
            Self::Production => ApiConfig {
                base_url: "https://api.shoplink.app/api".to_string(),
                timeout: Duration::from_secs(30),
                retry_attempts: 2,
                retry_delay: Duration::from_millis(2000),
                max_retry_delay: Duration::from_secs(10),
            },
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = ShopLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ShopLinkError::Config(format!("Unknown environment: {other}"))),
        }
    }
}

/// Settings for the request executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix prepended to every request path
    pub base_url: String,

    /// Per-attempt timeout
    #[serde(with = "duration_millis", default = "default_timeout")]
    pub timeout: Duration,

    /// Retries after the first attempt (total attempts = retries + 1)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay for exponential backoff
    #[serde(with = "duration_millis", default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Upper bound on a single backoff delay, before jitter
    #[serde(with = "duration_millis", default = "default_max_retry_delay")]
    pub max_retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Environment::default().api_defaults()
    }
}

impl ApiConfig {
    /// Check that the base URL is absolute and the numbers are usable.
    ///
    /// # Errors
    /// Returns `ShopLinkError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            ShopLinkError::Config(format!("Invalid base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShopLinkError::Config(format!(
                "base_url must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(ShopLinkError::Config("timeout must be greater than 0".to_string()));
        }
        if self.max_retry_delay < self.retry_delay {
            return Err(ShopLinkError::Config(
                "max_retry_delay must not be smaller than retry_delay".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging settings consumed by the tracing bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

/// Everything the client needs at startup
///
/// When deserialized, API fields missing from the input are taken from the
/// preset of the selected [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "SettingsFile")]
pub struct ClientSettings {
    pub environment: Environment,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// On-disk shape of [`ClientSettings`]
#[derive(Deserialize)]
struct SettingsFile {
    #[serde(default)]
    environment: Environment,
    api: ApiOverrides,
    #[serde(default)]
    logging: LoggingConfig,
}

/// API section with every value but the base URL optional; durations in ms
#[derive(Deserialize)]
struct ApiOverrides {
    base_url: String,
    timeout: Option<u64>,
    retry_attempts: Option<u32>,
    retry_delay: Option<u64>,
    max_retry_delay: Option<u64>,
}

impl From<SettingsFile> for ClientSettings {
    fn from(file: SettingsFile) -> Self {
        let defaults = file.environment.api_defaults();
        let overrides = file.api;
        let retry_delay = overrides.retry_delay.map_or(defaults.retry_delay, Duration::from_millis);
        let max_retry_delay = overrides
            .max_retry_delay
            .map_or_else(|| defaults.max_retry_delay.max(retry_delay), Duration::from_millis);

        let api = ApiConfig {
            base_url: overrides.base_url,
            timeout: overrides.timeout.map_or(defaults.timeout, Duration::from_millis),
            retry_attempts: overrides.retry_attempts.unwrap_or(defaults.retry_attempts),
            retry_delay,
            max_retry_delay,
        };

        Self { environment: file.environment, api, logging: file.logging }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "info".to_string()
}
