//! Test fixtures
//!
//! Canonical admin settings payloads and token bodies shared by unit and
//! integration tests.

use serde_json::{json, Map, Value};

use crate::storage::keys::app;
use crate::storage::{ConfigRepository, Scope, StorageResult};

/// Complete OAuth2 admin settings form.
///
/// # Examples
///
/// ```
/// use openproject_common::testing::fixtures::oauth2_admin_settings;
///
/// let values = oauth2_admin_settings("http://openproject.com");
/// assert_eq!(values["authorization_method"], "oauth2");
/// ```
#[must_use]
pub fn oauth2_admin_settings(instance_url: &str) -> Map<String, Value> {
    as_map(json!({
        "authorization_method": "oauth2",
        "openproject_instance_url": instance_url,
        "openproject_client_id": "a",
        "openproject_client_secret": "b",
        "default_enable_navigation": false,
        "default_enable_unified_search": false,
        "setup_project_folder": false,
        "setup_app_password": false
    }))
}

/// Complete OIDC admin settings form for an external provider with token
/// exchange enabled.
#[must_use]
pub fn oidc_admin_settings(instance_url: &str) -> Map<String, Value> {
    as_map(json!({
        "authorization_method": "oidc",
        "openproject_instance_url": instance_url,
        "sso_provider_type": "external",
        "oidc_provider": "keycloak",
        "targeted_audience_client_id": "openproject",
        "token_exchange": true,
        "default_enable_navigation": false,
        "default_enable_unified_search": false,
        "setup_project_folder": false,
        "setup_app_password": false
    }))
}

/// Persist a working OAuth2 client registration pointing at `instance_url`.
pub async fn seed_oauth2_settings(
    repository: &dyn ConfigRepository,
    instance_url: &str,
) -> StorageResult<()> {
    repository.set(&Scope::App, app::AUTHORIZATION_METHOD, "oauth2").await?;
    repository.set(&Scope::App, app::INSTANCE_URL, instance_url).await?;
    repository.set(&Scope::App, app::CLIENT_ID, "client-id").await?;
    repository.set(&Scope::App, app::CLIENT_SECRET, "client-secret-0123456789").await?;
    Ok(())
}

/// Token endpoint response body.
#[must_use]
pub fn token_body(access_token: &str, refresh_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": expires_in,
        "token_type": "Bearer"
    })
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
