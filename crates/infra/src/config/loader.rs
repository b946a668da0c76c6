//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `OP_INTEGRATION_BIND_ADDRESS`: Listen address of the HTTP server
//! - `OP_INTEGRATION_PUBLIC_URL`: Externally reachable base URL
//! - `OP_INTEGRATION_DB_PATH`: Database file path
//! - `OP_INTEGRATION_DB_POOL_SIZE`: Connection pool size
//!
//! Optional:
//! - `OP_INTEGRATION_HTTP_TIMEOUT`: Outbound request timeout in seconds (30)
//! - `OP_INTEGRATION_USER_AGENT`: Outbound `User-Agent`
//! - `OP_INTEGRATION_LOG_LEVEL`: `EnvFilter` directive (`info`)
//! - `OP_INTEGRATION_LOG_JSON`: JSON log output (false)
//! - `OP_INTEGRATION_NOTIFICATIONS_ENABLED`: Run the notification sweep (true)
//! - `OP_INTEGRATION_NOTIFICATIONS_INTERVAL`: Sweep interval in seconds (300)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./openproject-integration.json` or `./openproject-integration.toml`
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use openproject_domain::{
    Config, DatabaseConfig, HttpConfig, IntegrationError, LoggingConfig, NotificationConfig, Result,
    ServerConfig,
};

const CONFIG_FILE_STEMS: [&str; 2] = ["config", "openproject-integration"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `IntegrationError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `IntegrationError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();

    let bind_address = env_var("OP_INTEGRATION_BIND_ADDRESS")?;
    let public_url = env_var("OP_INTEGRATION_PUBLIC_URL")?;
    let db_path = env_var("OP_INTEGRATION_DB_PATH")?;
    let db_pool_size = env_var("OP_INTEGRATION_DB_POOL_SIZE").and_then(|s| parse_number::<u32>(&s, "pool size"))?;

    let timeout_seconds = env_opt("OP_INTEGRATION_HTTP_TIMEOUT")
        .map(|s| parse_number::<u64>(&s, "http timeout"))
        .transpose()?
        .unwrap_or(defaults.http.timeout_seconds);
    let user_agent = env_opt("OP_INTEGRATION_USER_AGENT").unwrap_or(defaults.http.user_agent);

    let level = env_opt("OP_INTEGRATION_LOG_LEVEL").unwrap_or(defaults.logging.level);
    let json = env_bool("OP_INTEGRATION_LOG_JSON", defaults.logging.json);

    let notifications_enabled = env_bool("OP_INTEGRATION_NOTIFICATIONS_ENABLED", defaults.notifications.enabled);
    let interval_seconds = env_opt("OP_INTEGRATION_NOTIFICATIONS_INTERVAL")
        .map(|s| parse_number::<u64>(&s, "notification interval"))
        .transpose()?
        .unwrap_or(defaults.notifications.interval_seconds);

    Ok(Config {
        server: ServerConfig { bind_address, public_url },
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        http: HttpConfig { timeout_seconds, user_agent },
        logging: LoggingConfig { level, json },
        notifications: NotificationConfig { enabled: notifications_enabled, interval_seconds },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `IntegrationError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(IntegrationError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            IntegrationError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| IntegrationError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `IntegrationError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| IntegrationError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| IntegrationError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(IntegrationError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, and the executable's
/// directory for `config.{json,toml}` and `openproject-integration.{json,toml}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
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

    dirs.iter()
        .flat_map(|dir| {
            CONFIG_FILE_STEMS
                .iter()
                .flat_map(move |stem| ["json", "toml"].map(|ext| dir.join(format!("{stem}.{ext}"))))
        })
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `IntegrationError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| IntegrationError::Config(format!("Missing required environment variable: {}", key)))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(raw: &str, what: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| IntegrationError::Config(format!("Invalid {what}: {e}")))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
