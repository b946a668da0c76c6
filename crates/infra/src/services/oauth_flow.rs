//! OAuth connect journey
//!
//! 1. [`OAuthConnectService::start_connect`] remembers where the user came
//!    from and hands out the authorization URL.
//! 2. OpenProject redirects back; [`OAuthConnectService::handle_redirect`]
//!    exchanges the code, stores the credential and the remote identity, and
//!    leaves a one-time marker describing the outcome.
//! 3. The page the user lands on consumes the marker with
//!    [`OAuthConnectService::take_flash`].

use std::sync::Arc;

use openproject_common::auth::{load_client_credentials, AuthMode, Credential, OAuthExchangeClient, TokenStore};
use openproject_common::storage::keys::{app, user};
use openproject_common::storage::{ConfigRepository, Scope};
use openproject_common::validation::AuthorizationMethod;
use openproject_domain::constants::{
    CONNECTION_ERROR, CONNECTION_SUCCESS, DEFAULT_JOURNEY_DESTINATION, GENERIC_CONNECTION_ERROR_MESSAGE,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{user_info, ServiceError};
use crate::api::OpenProjectClient;

/// Outcome of the last connect attempt, shown once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionFlash {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct OAuthConnectService {
    exchange: Arc<OAuthExchangeClient>,
    client: Arc<OpenProjectClient>,
    repository: Arc<dyn ConfigRepository>,
    redirect_uri: String,
}

impl OAuthConnectService {
    pub fn new(
        exchange: Arc<OAuthExchangeClient>,
        client: Arc<OpenProjectClient>,
        repository: Arc<dyn ConfigRepository>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self { exchange, client, repository, redirect_uri: redirect_uri.into() }
    }

    fn tokens(&self) -> &Arc<TokenStore> {
        self.client.tokens()
    }

    /// Begin a connect journey and return the authorization URL.
    ///
    /// `starting_page` is only remembered when it is a local path.
    ///
    /// # Errors
    /// [`ServiceError::NotConfigured`] unless OAuth2 is the configured method
    /// with an instance URL and client id.
    #[instrument(skip(self))]
    pub async fn start_connect(
        &self,
        principal: &str,
        session_id: &str,
        starting_page: Option<&str>,
    ) -> Result<String, ServiceError> {
        let method = self.repository.get(&Scope::App, app::AUTHORIZATION_METHOD).await?;
        if method.as_deref().and_then(AuthorizationMethod::parse) != Some(AuthorizationMethod::OAuth2) {
            return Err(ServiceError::NotConfigured("OAuth2 is not the configured authorization method".into()));
        }

        let instance_url = self.required_setting(app::INSTANCE_URL).await?;
        let client_id = self.required_setting(app::CLIENT_ID).await?;

        let scope = Scope::user(principal);
        match starting_page.filter(|page| is_local_path(page)) {
            Some(page) => self.repository.set(&scope, user::JOURNEY_STARTING_PAGE, page).await?,
            None => self.repository.delete(&scope, user::JOURNEY_STARTING_PAGE).await?,
        }

        let request = self
            .exchange
            .build_authorization_request(session_id, &client_id, &instance_url, &self.redirect_uri)
            .await?;

        info!(principal, "oauth connect started");
        Ok(request.url)
    }

    /// Complete the journey with the code and state OpenProject returned.
    ///
    /// Never fails: every problem is logged, recorded as an error marker and
    /// the user is sent back to where the journey started.
    #[instrument(skip(self, code, state))]
    pub async fn handle_redirect(&self, principal: &str, session_id: &str, code: &str, state: &str) -> String {
        let scope = Scope::user(principal);
        let destination = match self.repository.get(&scope, user::JOURNEY_STARTING_PAGE).await {
            Ok(page) => page.filter(|p| is_local_path(p)),
            Err(err) => {
                warn!(principal, error = %err, "could not read journey starting page");
                None
            }
        }
        .unwrap_or_else(|| DEFAULT_JOURNEY_DESTINATION.to_string());

        let outcome = self.complete_exchange(principal, session_id, code, state).await;
        let marker = match &outcome {
            Ok(()) => {
                info!(principal, "oauth connection established");
                self.write_flash(&scope, CONNECTION_SUCCESS, None).await
            }
            Err(err) => {
                warn!(principal, error = %err, "oauth connection failed");
                self.write_flash(&scope, CONNECTION_ERROR, Some(GENERIC_CONNECTION_ERROR_MESSAGE)).await
            }
        };
        if let Err(err) = marker {
            warn!(principal, error = %err, "could not record connection result");
        }
        if let Err(err) = self.repository.delete(&scope, user::JOURNEY_STARTING_PAGE).await {
            warn!(principal, error = %err, "could not clear journey starting page");
        }

        destination
    }

    /// Read and remove the one-time connection marker.
    ///
    /// # Errors
    /// Returns error if the repository fails.
    pub async fn take_flash(&self, principal: &str) -> Result<Option<ConnectionFlash>, ServiceError> {
        let scope = Scope::user(principal);
        let result = self.repository.get(&scope, user::CONNECTION_RESULT).await?;
        let message = self.repository.get(&scope, user::CONNECTION_ERROR_MESSAGE).await?;
        self.repository.delete(&scope, user::CONNECTION_RESULT).await?;
        self.repository.delete(&scope, user::CONNECTION_ERROR_MESSAGE).await?;

        Ok(result.map(|result| ConnectionFlash { result, message }))
    }

    /// Store tokens handed over by the OIDC provider.
    ///
    /// The remote identity is refreshed on a best-effort basis.
    ///
    /// # Errors
    /// [`ServiceError::NotConfigured`] unless OIDC is the configured method;
    /// [`ServiceError::Tokens`] for a malformed payload.
    #[instrument(skip(self, token_data))]
    pub async fn store_oidc_token(&self, principal: &str, token_data: &Value) -> Result<Credential, ServiceError> {
        let method = self.repository.get(&Scope::App, app::AUTHORIZATION_METHOD).await?;
        if method.as_deref().and_then(AuthorizationMethod::parse) != Some(AuthorizationMethod::Oidc) {
            return Err(ServiceError::NotConfigured("OIDC is not the configured authorization method".into()));
        }

        let credential = self.tokens().store(principal, token_data).await?;
        if let Err(err) = user_info::fetch_and_store(&self.client, self.repository.as_ref(), principal, AuthMode::OAuth).await
        {
            warn!(principal, error = %err, "could not fetch OpenProject identity for OIDC user");
        }
        Ok(credential)
    }

    async fn complete_exchange(
        &self,
        principal: &str,
        session_id: &str,
        code: &str,
        state: &str,
    ) -> Result<(), ServiceError> {
        // The pending state is single use even when the exchange never starts.
        let registration = match load_client_credentials(self.repository.as_ref()).await {
            Ok(Some(registration)) => registration,
            Ok(None) => {
                self.exchange.discard_pending(session_id).await?;
                return Err(ServiceError::NotConfigured("OAuth client registration is incomplete".into()));
            }
            Err(err) => {
                self.exchange.discard_pending(session_id).await?;
                return Err(err.into());
            }
        };

        let payload = self
            .exchange
            .exchange_authorization_code(session_id, code, state, &registration, &self.redirect_uri)
            .await?;
        self.tokens().store_payload(principal, payload).await?;

        if let Err(err) =
            user_info::fetch_and_store(&self.client, self.repository.as_ref(), principal, AuthMode::OAuth).await
        {
            self.tokens().clear(principal).await?;
            return Err(err);
        }
        Ok(())
    }

    async fn write_flash(
        &self,
        scope: &Scope,
        result: &str,
        message: Option<&str>,
    ) -> Result<(), ServiceError> {
        self.repository.set(scope, user::CONNECTION_RESULT, result).await?;
        match message {
            Some(message) => self.repository.set(scope, user::CONNECTION_ERROR_MESSAGE, message).await?,
            None => self.repository.delete(scope, user::CONNECTION_ERROR_MESSAGE).await?,
        }
        Ok(())
    }

    async fn required_setting(&self, key: &str) -> Result<String, ServiceError> {
        self.repository
            .get(&Scope::App, key)
            .await?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::NotConfigured(format!("{key} is not set")))
    }
}

/// Same-origin absolute path, e.g. `/apps/files`. Rejects `//host` and
/// absolute URLs.
fn is_local_path(page: &str) -> bool {
    page.starts_with('/') && !page.starts_with("//") && !page.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_paths_are_destinations() {
        assert!(is_local_path("/apps/files"));
        assert!(is_local_path("/"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
        assert!(!is_local_path(""));
    }
}
