//! OAuth 2.0 exchange client for an OpenProject instance
//!
//! Handles the server side of the authorization-code + PKCE flow:
//! - authorization URL building with a freshly persisted PKCE state
//! - authorization code exchange (single-use state)
//! - refresh-token grant

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::pkce::{is_valid_code_verifier, PkceExchangeState};
use super::state::PkceStateStore;
use super::traits::OAuthClientTrait;
use super::types::{ClientCredentials, Credential, OAuthError, TokenPayload};
use crate::storage::StorageError;

/// Minimum shape a configured client secret must have before it is sent.
pub const CLIENT_SECRET_PATTERN: &str = r"^.{10,}$";

static CLIENT_SECRET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(CLIENT_SECRET_PATTERN).expect("CLIENT_SECRET_REGEX should compile - this is a bug")
});

/// Error type for OAuth exchange operations
#[derive(Debug)]
pub enum OAuthFlowError {
    /// No pending exchange, expired, too short, or not the state we issued.
    StateMismatch,

    /// Stored verifier does not satisfy the PKCE alphabet/length rule.
    InvalidCodeVerifier,

    /// Configured client secret is too short to be genuine.
    InvalidClientSecret,

    /// Token endpoint refused the grant or answered with an unusable body.
    TokenExchangeFailed { reason: String },

    /// Credential carries no refresh token.
    NoRefreshToken,

    /// HTTP request failed before a response arrived.
    RequestFailed(reqwest::Error),

    /// Pending-state persistence failed.
    Storage(StorageError),
}

impl std::fmt::Display for OAuthFlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateMismatch => write!(f, "OAuth state mismatch"),
            Self::InvalidCodeVerifier => write!(f, "Invalid PKCE code verifier"),
            Self::InvalidClientSecret => write!(f, "Invalid OAuth client secret"),
            Self::TokenExchangeFailed { reason } => write!(f, "Token exchange failed: {reason}"),
            Self::NoRefreshToken => write!(f, "No refresh token available"),
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::Storage(e) => write!(f, "State storage failed: {e}"),
        }
    }
}

impl std::error::Error for OAuthFlowError {}

impl From<reqwest::Error> for OAuthFlowError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

impl From<StorageError> for OAuthFlowError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// Outcome of [`OAuthExchangeClient::build_authorization_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Where the browser must be sent.
    pub url: String,
    /// State nonce embedded in `url`.
    pub state: String,
}

/// Authorization-code and refresh grants against `{instance}/oauth/token`.
#[derive(Clone)]
pub struct OAuthExchangeClient {
    client: Client,
    states: PkceStateStore,
}

impl OAuthExchangeClient {
    pub fn new(client: Client, states: PkceStateStore) -> Self {
        Self { client, states }
    }

    /// Start a connect attempt for `session_id`.
    ///
    /// A new PKCE state replaces any previous pending one for the session.
    ///
    /// # Errors
    /// Returns [`OAuthFlowError::Storage`] if the state cannot be persisted.
    pub async fn build_authorization_request(
        &self,
        session_id: &str,
        client_id: &str,
        instance_url: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, OAuthFlowError> {
        let pkce = PkceExchangeState::generate();
        self.states.save(session_id, &pkce).await?;

        let params = [
            ("client_id", client_id.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("response_type", "code".to_string()),
            ("state", pkce.state.clone()),
            ("code_challenge", pkce.code_challenge()),
            ("code_challenge_method", pkce.challenge_method().to_string()),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!("{}/oauth/authorize?{query_string}", instance_url.trim_end_matches('/'));
        debug!(session_id, "built authorization request");

        Ok(AuthorizationRequest { url, state: pkce.state })
    }

    /// Drop the pending state for `session_id` without exchanging anything.
    ///
    /// # Errors
    /// Returns [`OAuthFlowError::Storage`] if the state cannot be removed.
    pub async fn discard_pending(&self, session_id: &str) -> Result<(), OAuthFlowError> {
        if self.states.take(session_id).await?.is_some() {
            debug!(session_id, "discarded pending oauth state");
        }
        Ok(())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The pending state is removed before any check runs, so every attempt
    /// (successful or not) consumes it.
    ///
    /// # Errors
    /// [`OAuthFlowError::StateMismatch`], [`OAuthFlowError::InvalidCodeVerifier`],
    /// [`OAuthFlowError::InvalidClientSecret`] (in that order), then
    /// [`OAuthFlowError::TokenExchangeFailed`] for a refused or malformed
    /// token response.
    pub async fn exchange_authorization_code(
        &self,
        session_id: &str,
        code: &str,
        returned_state: &str,
        client: &ClientCredentials,
        redirect_uri: &str,
    ) -> Result<TokenPayload, OAuthFlowError> {
        let pending = self.states.take(session_id).await?;

        let pkce = match pending {
            Some(pkce) if pkce.matches_state(returned_state) => pkce,
            _ => {
                warn!(session_id, "oauth state mismatch");
                return Err(OAuthFlowError::StateMismatch);
            }
        };

        if !is_valid_code_verifier(&pkce.code_verifier) {
            return Err(OAuthFlowError::InvalidCodeVerifier);
        }

        if !CLIENT_SECRET_REGEX.is_match(&client.client_secret) {
            return Err(OAuthFlowError::InvalidClientSecret);
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", pkce.code_verifier.as_str()),
        ];

        let body = self.post_token_request(client, &form).await?;
        let payload =
            TokenPayload::from_value(&body).map_err(|reason| OAuthFlowError::TokenExchangeFailed { reason })?;

        info!(session_id, "authorization code exchanged");
        Ok(payload)
    }

    /// Run the refresh-token grant for `credential`.
    ///
    /// When the server omits a new refresh token the current one is kept.
    ///
    /// # Errors
    /// [`OAuthFlowError::NoRefreshToken`] if there is nothing to refresh with,
    /// [`OAuthFlowError::TokenExchangeFailed`] if the server refuses.
    pub async fn refresh_access_token(
        &self,
        credential: &Credential,
        client: &ClientCredentials,
    ) -> Result<TokenPayload, OAuthFlowError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(OAuthFlowError::NoRefreshToken)?;

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        let mut body = self.post_token_request(client, &form).await?;
        if let Value::Object(map) = &mut body {
            if !map.get("refresh_token").is_some_and(|v| v.as_str().is_some_and(|s| !s.is_empty())) {
                map.insert("refresh_token".into(), Value::String(refresh_token.to_string()));
            }
        }

        let mut payload =
            TokenPayload::from_value(&body).map_err(|reason| OAuthFlowError::TokenExchangeFailed { reason })?;
        if payload.provider_id.is_none() {
            payload.provider_id = credential.provider_id.clone();
        }

        debug!("access token refreshed");
        Ok(payload)
    }

    async fn post_token_request(
        &self,
        client: &ClientCredentials,
        form: &[(&str, &str)],
    ) -> Result<Value, OAuthFlowError> {
        let response = self.client.post(client.token_url()).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<OAuthError>(&text) {
                Ok(error) => error.to_string(),
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            warn!(status = status.as_u16(), %reason, "token endpoint refused grant");
            return Err(OAuthFlowError::TokenExchangeFailed { reason });
        }

        response.json::<Value>().await.map_err(|e| OAuthFlowError::TokenExchangeFailed {
            reason: format!("unreadable token response: {e}"),
        })
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthExchangeClient {
    async fn exchange_authorization_code(
        &self,
        session_id: &str,
        code: &str,
        returned_state: &str,
        client: &ClientCredentials,
        redirect_uri: &str,
    ) -> Result<TokenPayload, OAuthFlowError> {
        self.exchange_authorization_code(session_id, code, returned_state, client, redirect_uri)
            .await
    }

    async fn refresh_access_token(
        &self,
        credential: &Credential,
        client: &ClientCredentials,
    ) -> Result<TokenPayload, OAuthFlowError> {
        self.refresh_access_token(credential, client).await
    }
}
