//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use openproject_domain::IntegrationError;
use openproject_infra::config;
use tempfile::Builder;

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_json_file() {
    let file = config_file(
        ".json",
        r#"{
            "server": { "bind_address": "0.0.0.0:9000", "public_url": "https://nc.example.com/apps/integration" },
            "database": { "path": "/tmp/integration_test.db", "pool_size": 10 },
            "http": { "timeout_seconds": 12, "user_agent": "integration-test" },
            "logging": { "level": "debug", "json": true },
            "notifications": { "enabled": false, "interval_seconds": 60 }
        }"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("json config");

    assert_eq!(config.server.bind_address, "0.0.0.0:9000");
    assert_eq!(config.server.redirect_uri(), "https://nc.example.com/apps/integration/oauth-redirect");
    assert_eq!(config.database.path, "/tmp/integration_test.db");
    assert_eq!(config.database.pool_size, 10);
    assert_eq!(config.http.timeout_seconds, 12);
    assert!(config.logging.json);
    assert!(!config.notifications.enabled);
    assert_eq!(config.notifications.interval_seconds, 60);
}

#[test]
fn test_load_config_from_toml_file_without_notifications_section() {
    let file = config_file(
        ".toml",
        r#"
[server]
bind_address = "127.0.0.1:8081"
public_url = "http://localhost:8081/"

[database]
path = "/tmp/integration_test_toml.db"
pool_size = 4

[http]
timeout_seconds = 30
user_agent = "integration-test"

[logging]
level = "info"
json = false
"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("toml config");

    assert_eq!(config.server.redirect_uri(), "http://localhost:8081/oauth-redirect");
    assert_eq!(config.database.pool_size, 4);
    assert!(config.notifications.enabled, "notification sweep defaults to on");
}

#[test]
fn test_missing_required_section_is_config_error() {
    let file = config_file(".json", r#"{ "database": { "path": "x.db", "pool_size": 1 } }"#);

    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(IntegrationError::Config(msg)) if msg.contains("Invalid JSON")));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let file = config_file(".yaml", "server: {}");

    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(IntegrationError::Config(msg)) if msg.contains("Unsupported")));
}

#[test]
fn test_nonexistent_file_is_rejected() {
    let result = config::load_from_file(Some("/nonexistent/openproject-integration.toml".into()));
    assert!(matches!(result, Err(IntegrationError::Config(msg)) if msg.contains("not found")));
}
