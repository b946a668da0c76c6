//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_NOTIFICATION_SWEEP_SECS;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Inbound HTTP surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Externally reachable base URL, used to build the OAuth redirect URI.
    pub public_url: String,
}

impl ServerConfig {
    /// Absolute URL OpenProject redirects back to after authorization.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), crate::constants::OAUTH_REDIRECT_ROUTE)
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `openproject_infra=debug`.
    pub level: String,
    pub json: bool,
}

/// Background notification sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true, interval_seconds: DEFAULT_NOTIFICATION_SWEEP_SECS }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1:8080".to_string(),
                public_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig { path: "openproject-integration.db".to_string(), pool_size: 8 },
            http: HttpConfig {
                timeout_seconds: 30,
                user_agent: concat!("openproject-integration/", env!("CARGO_PKG_VERSION")).to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), json: false },
            notifications: NotificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_joins_public_url() {
        let server = ServerConfig {
            bind_address: "0.0.0.0:80".into(),
            public_url: "https://cloud.example.com/".into(),
        };
        assert_eq!(server.redirect_uri(), "https://cloud.example.com/oauth-redirect");
    }

    #[test]
    fn notifications_default_when_absent() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        json.as_object_mut().unwrap().remove("notifications");
        let parsed: Config = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.notifications, NotificationConfig::default());
    }
}
