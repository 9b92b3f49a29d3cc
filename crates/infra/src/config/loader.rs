//! Configuration loader
//!
//! Loads [`ClientSettings`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment when one exists
//! 2. Attempts to load from environment variables
//! 3. If `SHOPLINK_API_BASE_URL` is unset, falls back to a config file
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `SHOPLINK_API_BASE_URL`: API base URL (required)
//! - `SHOPLINK_ENV`: `development`, `staging` or `production`; selects the
//!   defaults for everything below
//! - `SHOPLINK_API_TIMEOUT_MS`: Per-attempt timeout in milliseconds
//! - `SHOPLINK_API_RETRY_ATTEMPTS`: Retries after the first attempt
//! - `SHOPLINK_API_RETRY_DELAY_MS`: Base backoff delay in milliseconds
//! - `SHOPLINK_LOG_LEVEL`: Default log filter when `RUST_LOG` is unset
//! - `SHOPLINK_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./shoplink.json` or `./shoplink.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names in the parent directory
//! 4. The same names next to the executable

use std::path::{Path, PathBuf};
use std::time::Duration;

use shoplink_domain::{
    ApiConfig, ClientSettings, Environment, LoggingConfig, Result, ShopLinkError,
};

const BASE_URL_VAR: &str = "SHOPLINK_API_BASE_URL";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ShopLinkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded values do not validate
pub fn load() -> Result<ClientSettings> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
    }

    match load_from_env() {
        Ok(settings) => {
            tracing::info!(
                environment = %settings.environment,
                "Configuration loaded from environment variables"
            );
            Ok(settings)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only the base URL is required; every other value falls back to the
/// defaults of the selected [`Environment`].
///
/// # Errors
/// Returns `ShopLinkError::Config` if the base URL is missing or any value
/// fails to parse or validate.
pub fn load_from_env() -> Result<ClientSettings> {
    let base_url = env_var(BASE_URL_VAR)?;
    let environment = match std::env::var("SHOPLINK_ENV") {
        Ok(value) => value.parse::<Environment>()?,
        Err(_) => Environment::default(),
    };

    let defaults = environment.api_defaults();
    let timeout = env_millis("SHOPLINK_API_TIMEOUT_MS")?.unwrap_or(defaults.timeout);
    let retry_attempts = match std::env::var("SHOPLINK_API_RETRY_ATTEMPTS") {
        Ok(value) => value.trim().parse::<u32>().map_err(|e| {
            ShopLinkError::Config(format!("Invalid SHOPLINK_API_RETRY_ATTEMPTS '{value}': {e}"))
        })?,
        Err(_) => defaults.retry_attempts,
    };
    let retry_delay = env_millis("SHOPLINK_API_RETRY_DELAY_MS")?.unwrap_or(defaults.retry_delay);

    let api = ApiConfig {
        base_url,
        timeout,
        retry_attempts,
        retry_delay,
        max_retry_delay: defaults.max_retry_delay.max(retry_delay),
    };

    let logging = LoggingConfig {
        level: std::env::var("SHOPLINK_LOG_LEVEL")
            .unwrap_or_else(|_| LoggingConfig::default().level),
        json: env_bool("SHOPLINK_LOG_JSON", false),
    };

    let settings = ClientSettings { environment, api, logging };
    settings.api.validate()?;
    Ok(settings)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is
/// detected by file extension. API values the file leaves out come from the
/// preset of its `environment`, as with [`load_from_env`].
///
/// # Errors
/// Returns `ShopLinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or the values do not validate
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ShopLinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ShopLinkError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ShopLinkError::Config(format!("Failed to read config file: {e}")))?;

    let settings = parse_config(&contents, &config_path)?;
    settings.api.validate()?;
    Ok(settings)
}

fn parse_config(contents: &str, path: &Path) -> Result<ClientSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ShopLinkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ShopLinkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ShopLinkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// Returns the first file that exists, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    probe_dirs(&dirs)
}

fn probe_dirs(dirs: &[PathBuf]) -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["shoplink.json", "shoplink.toml", "config.json", "config.toml"];

    dirs.iter().flat_map(|dir| NAMES.iter().map(move |name| dir.join(name))).find(|p| p.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ShopLinkError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// `Ok(None)` when unset.
fn env_millis(key: &str) -> Result<Option<Duration>> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|e| ShopLinkError::Config(format!("Invalid {key} '{value}': {e}")))
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 7] = [
        "SHOPLINK_API_BASE_URL",
        "SHOPLINK_ENV",
        "SHOPLINK_API_TIMEOUT_MS",
        "SHOPLINK_API_RETRY_ATTEMPTS",
        "SHOPLINK_API_RETRY_DELAY_MS",
        "SHOPLINK_LOG_LEVEL",
        "SHOPLINK_LOG_JSON",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn env_bool_parsing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        for value in ["1", "true", "YES", "on"] {
            std::env::set_var("SHOPLINK_TEST_BOOL", value);
            assert!(env_bool("SHOPLINK_TEST_BOOL", false), "{value}");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("SHOPLINK_TEST_BOOL", value);
            assert!(!env_bool("SHOPLINK_TEST_BOOL", true), "{value}");
        }

        std::env::remove_var("SHOPLINK_TEST_BOOL");
        assert!(env_bool("SHOPLINK_TEST_BOOL", true));
    }

    #[test]
    fn env_only_base_url_uses_environment_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("SHOPLINK_API_BASE_URL", "https://example.test/api");
        std::env::set_var("SHOPLINK_ENV", "production");

        let settings = load_from_env().unwrap();
        clear_env();

        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.api.base_url, "https://example.test/api");
        assert_eq!(settings.api.timeout, Duration::from_secs(30));
        assert_eq!(settings.api.retry_attempts, 2);
        assert_eq!(settings.api.retry_delay, Duration::from_millis(2000));
        assert_eq!(settings.logging, LoggingConfig::default());
    }

    #[test]
    fn env_overrides_every_field() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("SHOPLINK_API_BASE_URL", "http://localhost:4000");
        std::env::set_var("SHOPLINK_API_TIMEOUT_MS", "2500");
        std::env::set_var("SHOPLINK_API_RETRY_ATTEMPTS", "5");
        std::env::set_var("SHOPLINK_API_RETRY_DELAY_MS", "20000");
        std::env::set_var("SHOPLINK_LOG_LEVEL", "debug");
        std::env::set_var("SHOPLINK_LOG_JSON", "true");

        let settings = load_from_env().unwrap();
        clear_env();

        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.api.timeout, Duration::from_millis(2500));
        assert_eq!(settings.api.retry_attempts, 5);
        assert_eq!(settings.api.retry_delay, Duration::from_secs(20));
        assert_eq!(settings.api.max_retry_delay, Duration::from_secs(20));
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn env_missing_or_invalid_values() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(matches!(load_from_env(), Err(ShopLinkError::Config(_))));

        std::env::set_var("SHOPLINK_API_BASE_URL", "https://example.test");
        std::env::set_var("SHOPLINK_API_TIMEOUT_MS", "soon");
        assert!(matches!(load_from_env(), Err(ShopLinkError::Config(_))));

        std::env::remove_var("SHOPLINK_API_TIMEOUT_MS");
        std::env::set_var("SHOPLINK_ENV", "qa");
        assert!(load_from_env().is_err());

        std::env::remove_var("SHOPLINK_ENV");
        std::env::set_var("SHOPLINK_API_BASE_URL", "not a url");
        assert!(load_from_env().is_err());
        clear_env();
    }

    #[test]
    fn load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "shoplink.toml",
            r#"
environment = "staging"

[api]
base_url = "https://staging.example.test/api"
retry_attempts = 1

[logging]
level = "warn"
"#,
        );

        let settings = load_from_file(Some(path)).unwrap();

        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.api.retry_attempts, 1);
        assert_eq!(settings.api.timeout, Environment::Staging.api_defaults().timeout);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn load_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"api": {"base_url": "https://example.test", "timeout": 1500, "retry_delay": 100}}"#,
        );

        let settings = load_from_file(Some(path)).unwrap();

        assert_eq!(settings.api.timeout, Duration::from_millis(1500));
        assert_eq!(settings.api.retry_delay, Duration::from_millis(100));
        assert_eq!(settings.environment, Environment::Development);
    }

    #[test]
    fn file_errors() {
        let missing = load_from_file(Some(PathBuf::from("/nonexistent/shoplink.toml")));
        assert!(matches!(missing, Err(ShopLinkError::Config(_))));

        let dir = TempDir::new().unwrap();
        let invalid = write(&dir, "config.json", r#"{ "api": "#);
        assert!(load_from_file(Some(invalid)).is_err());

        let unvalidated = write(&dir, "shoplink.json", r#"{"api": {"base_url": "/relative"}}"#);
        assert!(load_from_file(Some(unvalidated)).is_err());
    }

    #[test]
    fn unsupported_format() {
        let result = parse_config("api: {}", Path::new("shoplink.yaml"));
        assert!(matches!(result, Err(ShopLinkError::Config(_))));
    }

    #[test]
    fn probe_prefers_shoplink_over_config() {
        let empty = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        write(&dir, "config.toml", "");
        write(&dir, "shoplink.toml", "");

        let dirs = vec![empty.path().to_path_buf(), dir.path().to_path_buf()];
        assert_eq!(probe_dirs(&dirs), Some(dir.path().join("shoplink.toml")));
        assert_eq!(probe_dirs(&dirs[..1]), None);
    }
}
