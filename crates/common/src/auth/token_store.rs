//! Per-principal credential store with refresh-ahead
//!
//! Manages the credential lifecycle for every user:
//! - persistence through the injected [`ConfigRepository`]
//! - proactive refresh once half the token lifetime has elapsed
//! - forced refresh after the remote API rejected a token
//!
//! Refreshes for one principal are serialized. A caller that waited for the
//! lock re-reads the credential and reuses a token another task just obtained
//! instead of spending the refresh token a second time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::{OAuthExchangeClient, OAuthFlowError};
use super::traits::OAuthClientTrait;
use super::types::{AuthMode, ClientCredentials, Credential, TokenPayload};
use crate::storage::keys::{app, user};
use crate::storage::{ConfigRepository, Scope, StorageError};

/// Error type for token store operations
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Malformed token data: {0}")]
    MalformedTokenData(String),

    #[error("No credential stored for principal")]
    NotAuthenticated,

    #[error("OAuth client is not configured")]
    NotConfigured,

    #[error("Token refresh failed: {0}")]
    Refresh(#[from] OAuthFlowError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Read the OAuth client registration from the application settings.
///
/// Returns `None` unless instance URL, client id and client secret are all
/// present and non-empty.
pub async fn load_client_credentials(
    repository: &dyn ConfigRepository,
) -> Result<Option<ClientCredentials>, StorageError> {
    let instance_url = repository.get(&Scope::App, app::INSTANCE_URL).await?;
    let client_id = repository.get(&Scope::App, app::CLIENT_ID).await?;
    let client_secret = repository.get(&Scope::App, app::CLIENT_SECRET).await?;

    Ok(match (instance_url, client_id, client_secret) {
        (Some(url), Some(id), Some(secret))
            if !url.is_empty() && !id.is_empty() && !secret.is_empty() =>
        {
            Some(ClientCredentials::new(url, id, secret))
        }
        _ => None,
    })
}

/// Credential store shared by every request handler.
pub struct TokenStore<C: OAuthClientTrait + 'static = OAuthExchangeClient> {
    oauth_client: Arc<C>,
    repository: Arc<dyn ConfigRepository>,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<C: OAuthClientTrait + 'static> TokenStore<C> {
    pub fn new(oauth_client: Arc<C>, repository: Arc<dyn ConfigRepository>) -> Self {
        Self { oauth_client, repository, refresh_locks: DashMap::new() }
    }

    /// Store an OAuth credential from a raw token payload.
    ///
    /// Used both after a code exchange and when an OIDC provider hands over
    /// tokens. Overwrites any previous credential.
    ///
    /// # Errors
    /// [`TokenStoreError::MalformedTokenData`] if `access_token`,
    /// `refresh_token` or a numeric `expires_in` is missing.
    pub async fn store(&self, principal: &str, token_data: &Value) -> Result<Credential, TokenStoreError> {
        let payload = TokenPayload::from_value(token_data).map_err(TokenStoreError::MalformedTokenData)?;
        self.store_payload(principal, payload).await
    }

    /// Store an already validated token payload.
    ///
    /// # Errors
    /// Returns error if persistence fails.
    pub async fn store_payload(
        &self,
        principal: &str,
        payload: TokenPayload,
    ) -> Result<Credential, TokenStoreError> {
        let credential = Credential::from_payload(payload, Utc::now());
        self.persist(principal, &credential).await?;
        info!(principal, expires_in = credential.expires_in, "oauth credential stored");
        Ok(credential)
    }

    /// Store a personal API key.
    ///
    /// # Errors
    /// Returns error if persistence fails.
    pub async fn store_api_key(&self, principal: &str, key: &str) -> Result<Credential, TokenStoreError> {
        let credential = Credential::api_key(key, Utc::now());
        self.persist(principal, &credential).await?;
        info!(principal, "api key credential stored");
        Ok(credential)
    }

    /// Read the stored credential without refreshing it.
    ///
    /// # Errors
    /// Returns error if the repository fails or a stored field is corrupt.
    pub async fn load(&self, principal: &str) -> Result<Option<Credential>, TokenStoreError> {
        let scope = Scope::user(principal);
        let Some(access_token) = self.get(&scope, user::TOKEN).await?.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let refresh_token = self.get(&scope, user::REFRESH_TOKEN).await?.filter(|t| !t.is_empty());
        let auth_mode = match self.get(&scope, user::TOKEN_TYPE).await? {
            Some(label) => AuthMode::parse(&label)
                .ok_or_else(|| StorageError::corrupt(user::TOKEN_TYPE, format!("unknown mode {label}")))?,
            None if refresh_token.is_some() => AuthMode::OAuth,
            None => AuthMode::ApiKey,
        };

        let created_at = match self.get(&scope, user::TOKEN_CREATED_AT).await? {
            Some(raw) => parse_timestamp(&raw)?,
            None => DateTime::<Utc>::default(),
        };

        let expires_in = match self.get(&scope, user::TOKEN_EXPIRES_IN).await? {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|e| StorageError::corrupt(user::TOKEN_EXPIRES_IN, e.to_string()))?,
            ),
            None => None,
        };

        Ok(Some(Credential {
            access_token,
            auth_mode,
            refresh_token,
            created_at,
            expires_in,
            provider_id: self.get(&scope, user::OIDC_PROVIDER_ID).await?,
            id_token: self.get(&scope, user::ID_TOKEN).await?,
        }))
    }

    /// Current credential for `principal`.
    ///
    /// With `refresh`, an OAuth credential that is past its half-life but not
    /// yet expired is refreshed first. A failed proactive refresh is logged
    /// and the stored credential is returned unchanged. Expired credentials
    /// are returned as they are; the 401 path deals with them.
    ///
    /// # Errors
    /// Returns error only if the repository fails.
    pub async fn current(&self, principal: &str, refresh: bool) -> Result<Option<Credential>, TokenStoreError> {
        let Some(credential) = self.load(principal).await? else {
            return Ok(None);
        };

        if !refresh || !needs_refresh_ahead(&credential) {
            return Ok(Some(credential));
        }

        let lock = self.lock_for(principal);
        let _guard = lock.lock().await;

        // Another task may have refreshed while we waited.
        let Some(credential) = self.load(principal).await? else {
            return Ok(None);
        };
        if !needs_refresh_ahead(&credential) {
            return Ok(Some(credential));
        }

        match self.refresh_locked(principal, &credential).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(err) => {
                warn!(principal, error = %err, "proactive token refresh failed; keeping current token");
                Ok(Some(credential))
            }
        }
    }

    /// Refresh after the remote API rejected `failed_access_token`.
    ///
    /// If the stored token already differs from the rejected one, another
    /// task refreshed it and the stored credential is returned as is.
    ///
    /// # Errors
    /// [`TokenStoreError::NotAuthenticated`] without a credential,
    /// [`TokenStoreError::NotConfigured`] without a client registration,
    /// [`TokenStoreError::Refresh`] if the grant fails.
    pub async fn force_refresh(
        &self,
        principal: &str,
        failed_access_token: &str,
    ) -> Result<Credential, TokenStoreError> {
        let lock = self.lock_for(principal);
        let _guard = lock.lock().await;

        let credential = self.load(principal).await?.ok_or(TokenStoreError::NotAuthenticated)?;
        if credential.access_token != failed_access_token {
            debug!(principal, "token already refreshed by a concurrent request");
            return Ok(credential);
        }

        self.refresh_locked(principal, &credential).await
    }

    /// Remove the credential of `principal`.
    ///
    /// # Errors
    /// Returns error if the repository fails.
    pub async fn clear(&self, principal: &str) -> Result<(), TokenStoreError> {
        let scope = Scope::user(principal);
        for key in user::CREDENTIAL_KEYS {
            self.repository.delete(&scope, key).await?;
        }
        info!(principal, "credential cleared");
        Ok(())
    }

    /// Remove every stored credential. Returns how many were cleared.
    ///
    /// # Errors
    /// Returns error if the repository fails.
    pub async fn clear_all(&self) -> Result<usize, TokenStoreError> {
        let principals = self.repository.principals_with_key(user::TOKEN).await?;
        for principal in &principals {
            self.clear(principal).await?;
        }
        info!(count = principals.len(), "all user credentials cleared");
        Ok(principals.len())
    }

    async fn refresh_locked(
        &self,
        principal: &str,
        credential: &Credential,
    ) -> Result<Credential, TokenStoreError> {
        let client = load_client_credentials(self.repository.as_ref())
            .await?
            .ok_or(TokenStoreError::NotConfigured)?;

        let payload = self.oauth_client.refresh_access_token(credential, &client).await?;
        let mut refreshed = Credential::from_payload(payload, Utc::now());
        if refreshed.id_token.is_none() {
            refreshed.id_token = credential.id_token.clone();
        }
        self.persist(principal, &refreshed).await?;

        info!(principal, "access token refreshed");
        Ok(refreshed)
    }

    async fn persist(&self, principal: &str, credential: &Credential) -> Result<(), StorageError> {
        let scope = Scope::user(principal);
        let repo = &self.repository;

        repo.set(&scope, user::TOKEN, &credential.access_token).await?;
        repo.set(&scope, user::TOKEN_TYPE, credential.auth_mode.as_str()).await?;
        repo.set(&scope, user::TOKEN_CREATED_AT, &credential.created_at.to_rfc3339()).await?;

        let optional = [
            (user::REFRESH_TOKEN, credential.refresh_token.clone()),
            (user::TOKEN_EXPIRES_IN, credential.expires_in.map(|e| e.to_string())),
            (user::OIDC_PROVIDER_ID, credential.provider_id.clone()),
            (user::ID_TOKEN, credential.id_token.clone()),
        ];
        for (key, value) in optional {
            match value {
                Some(value) => repo.set(&scope, key, &value).await?,
                None => repo.delete(&scope, key).await?,
            }
        }
        Ok(())
    }

    /// Drop refresh locks nobody is holding or waiting on.
    ///
    /// Returns how many entries were removed.
    pub fn prune_idle_locks(&self) -> usize {
        let mut pruned = 0;
        self.refresh_locks.retain(|_, lock| {
            let busy = Arc::strong_count(lock) > 1;
            if !busy {
                pruned += 1;
            }
            busy
        });
        if pruned > 0 {
            debug!(pruned, "pruned idle refresh locks");
        }
        pruned
    }

    async fn get(&self, scope: &Scope, key: &str) -> Result<Option<String>, StorageError> {
        self.repository.get(scope, key).await
    }

    fn lock_for(&self, principal: &str) -> Arc<Mutex<()>> {
        self.refresh_locks.entry(principal.to_string()).or_default().clone()
    }
}

fn needs_refresh_ahead(credential: &Credential) -> bool {
    let now = Utc::now();
    credential.auth_mode == AuthMode::OAuth
        && credential.is_expiring_at(now)
        && !credential.is_expired_at(now)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| StorageError::corrupt(user::TOKEN_CREATED_AT, format!("unparseable timestamp {raw}")))
}
