//! Admin and per-user settings writes.

use std::sync::Arc;

use openproject_common::auth::{AuthMode, TokenStore};
use openproject_common::storage::keys::{app, user};
use openproject_common::storage::{ConfigRepository, Scope, StorageResult};
use openproject_common::validation::{
    required_keys, AuthorizationMethod, SettingsError, SettingsValidator, SsoProviderType,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use super::{user_info, ServiceError};
use crate::api::OpenProjectClient;

/// Settings whose change invalidates every issued credential.
const CREDENTIAL_BOUND_SETTINGS: &[&str] =
    &[app::AUTHORIZATION_METHOD, app::INSTANCE_URL, app::CLIENT_ID, app::CLIENT_SECRET];

const OAUTH2_ONLY: &[&str] = &[app::CLIENT_ID, app::CLIENT_SECRET];
const OIDC_ONLY: &[&str] =
    &[app::SSO_PROVIDER_TYPE, app::OIDC_PROVIDER, app::TARGETED_AUDIENCE_CLIENT_ID, app::TOKEN_EXCHANGE];

/// Keys a user may write through the per-user config endpoint.
pub const USER_CONFIG_KEYS: &[&str] = &[user::TOKEN, user::NAVIGATION_ENABLED, user::SEARCH_ENABLED];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminConfigOutcome {
    pub is_admin_config_complete: bool,
    /// Number of user credentials revoked by this write.
    pub cleared_credentials: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserConfigOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

pub struct SettingsService {
    repository: Arc<dyn ConfigRepository>,
    client: Arc<OpenProjectClient>,
}

impl SettingsService {
    pub fn new(repository: Arc<dyn ConfigRepository>, client: Arc<OpenProjectClient>) -> Self {
        Self { repository, client }
    }

    fn tokens(&self) -> &Arc<TokenStore> {
        self.client.tokens()
    }

    /// Whether the stored admin settings form a complete configuration.
    ///
    /// # Errors
    /// Returns error if the repository fails.
    pub async fn is_admin_config_complete(&self) -> StorageResult<bool> {
        let Some(method) = self.app_value(app::AUTHORIZATION_METHOD).await?.as_deref().and_then(AuthorizationMethod::parse)
        else {
            return Ok(false);
        };

        let sso = self.app_value(app::SSO_PROVIDER_TYPE).await?.as_deref().and_then(SsoProviderType::parse);
        let token_exchange = self.app_value(app::TOKEN_EXCHANGE).await?.map(|v| stored_bool(&v));

        for key in required_keys(method, sso, token_exchange) {
            if self.app_value(key).await?.filter(|v| !v.is_empty()).is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Validate and persist admin settings.
    ///
    /// A write is validated as a full setup while the stored configuration is
    /// incomplete or when it (re)selects the authorization method. Changing
    /// the method, instance URL or client registration revokes every user
    /// credential.
    ///
    /// # Errors
    /// [`ServiceError::Settings`] when validation fails; nothing is written
    /// in that case.
    #[instrument(skip_all, fields(keys = values.len()))]
    pub async fn set_admin_config(&self, values: &Map<String, Value>) -> Result<AdminConfigOutcome, ServiceError> {
        let complete_setup =
            values.contains_key(app::AUTHORIZATION_METHOD) || !self.is_admin_config_complete().await?;

        let candidate = self.with_stored_counterpart(values).await?;
        SettingsValidator::validate(&candidate, complete_setup)?;

        let mut credentials_invalidated = false;
        for key in CREDENTIAL_BOUND_SETTINGS {
            if let Some(new) = values.get(*key).and_then(Value::as_str) {
                let old = self.app_value(key).await?;
                if old.as_deref().is_some_and(|old| old != new) {
                    credentials_invalidated = true;
                }
            }
        }

        for (key, value) in values {
            self.repository.set(&Scope::App, key, &stored_text(value)).await?;
        }

        if let Some(method) = values.get(app::AUTHORIZATION_METHOD).and_then(Value::as_str).and_then(AuthorizationMethod::parse)
        {
            let stale = match method {
                AuthorizationMethod::OAuth2 => OIDC_ONLY,
                AuthorizationMethod::Oidc => OAUTH2_ONLY,
            };
            for key in stale {
                self.repository.delete(&Scope::App, key).await?;
            }
        }

        let cleared_credentials = if credentials_invalidated { self.tokens().clear_all().await? } else { 0 };
        let is_admin_config_complete = self.is_admin_config_complete().await?;

        info!(complete_setup, cleared_credentials, is_admin_config_complete, "admin settings saved");
        Ok(AdminConfigOutcome { is_admin_config_complete, cleared_credentials })
    }

    /// Write per-user settings.
    ///
    /// A non-empty `token` connects the user with a personal API key, which is
    /// checked against `users/me`; a rejected key is removed again. An empty
    /// or `null` token disconnects the user.
    ///
    /// # Errors
    /// [`SettingsError::InvalidKey`] for keys outside [`USER_CONFIG_KEYS`],
    /// [`SettingsError::InvalidType`] for wrongly typed values,
    /// [`ServiceError::Request`] when the API key is rejected.
    #[instrument(skip(self, values))]
    pub async fn set_user_config(
        &self,
        principal: &str,
        values: &Map<String, Value>,
    ) -> Result<UserConfigOutcome, ServiceError> {
        if let Some(key) = values.keys().find(|k| !USER_CONFIG_KEYS.contains(&k.as_str())) {
            return Err(SettingsError::InvalidKey { key: key.clone() }.into());
        }
        for key in [user::NAVIGATION_ENABLED, user::SEARCH_ENABLED] {
            if values.get(key).is_some_and(|v| !v.is_boolean()) {
                return Err(SettingsError::InvalidType { key: key.to_string(), expected: "boolean" }.into());
            }
        }
        if values.get(user::TOKEN).is_some_and(|v| !(v.is_string() || v.is_null())) {
            return Err(SettingsError::InvalidType { key: user::TOKEN.to_string(), expected: "string" }.into());
        }

        let scope = Scope::user(principal);
        for key in [user::NAVIGATION_ENABLED, user::SEARCH_ENABLED] {
            if let Some(value) = values.get(key) {
                self.repository.set(&scope, key, &stored_text(value)).await?;
            }
        }

        let Some(token) = values.get(user::TOKEN) else {
            return Ok(UserConfigOutcome::default());
        };

        match token.as_str().filter(|t| !t.is_empty()) {
            Some(api_key) => {
                self.tokens().store_api_key(principal, api_key).await?;
                match user_info::fetch_and_store(&self.client, self.repository.as_ref(), principal, AuthMode::ApiKey)
                    .await
                {
                    Ok(info) => {
                        info!(principal, "connected with personal API key");
                        Ok(UserConfigOutcome { user_name: Some(info.name) })
                    }
                    Err(err) => {
                        warn!(principal, error = %err, "personal API key rejected");
                        self.disconnect(principal).await?;
                        Err(err)
                    }
                }
            }
            None => {
                self.disconnect(principal).await?;
                Ok(UserConfigOutcome::default())
            }
        }
    }

    /// Forget the credential and remote identity of `principal`.
    ///
    /// # Errors
    /// Returns error if the repository fails.
    pub async fn disconnect(&self, principal: &str) -> Result<(), ServiceError> {
        self.tokens().clear(principal).await?;
        user_info::clear(self.repository.as_ref(), principal).await?;
        Ok(())
    }

    /// Fill in the stored half of the project folder pair so the pair is
    /// checked even when only one of them is submitted.
    async fn with_stored_counterpart(&self, values: &Map<String, Value>) -> StorageResult<Map<String, Value>> {
        let mut candidate = values.clone();
        let pair = [(app::SETUP_PROJECT_FOLDER, app::SETUP_APP_PASSWORD), (app::SETUP_APP_PASSWORD, app::SETUP_PROJECT_FOLDER)];
        for (present, missing) in pair {
            if values.contains_key(present) && !values.contains_key(missing) {
                if let Some(stored) = self.app_value(missing).await? {
                    candidate.insert(missing.to_string(), Value::Bool(stored_bool(&stored)));
                }
            }
        }
        Ok(candidate)
    }

    async fn app_value(&self, key: &str) -> StorageResult<Option<String>> {
        self.repository.get(&Scope::App, key).await
    }
}

/// Booleans are persisted as `1`/`0`.
fn stored_text(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn stored_bool(value: &str) -> bool {
    matches!(value, "1" | "true")
}
