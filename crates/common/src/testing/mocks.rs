//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::auth::{ClientCredentials, Credential, OAuthClientTrait, OAuthFlowError, TokenPayload};

/// Mock OAuth client that simulates the token endpoint without network calls.
#[derive(Clone, Debug)]
pub struct MockOAuthClient {
    refresh_calls: Arc<AtomicUsize>,
    exchange_calls: Arc<AtomicUsize>,
    refresh_response: Arc<Mutex<Option<Value>>>,
    exchange_response: Arc<Mutex<Option<Value>>>,
    should_fail: Arc<Mutex<bool>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockOAuthClient {
    /// Create a new mock OAuth client with default state.
    pub fn new() -> Self {
        Self {
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            exchange_calls: Arc::new(AtomicUsize::new(0)),
            refresh_response: Arc::new(Mutex::new(None)),
            exchange_response: Arc::new(Mutex::new(None)),
            should_fail: Arc::new(Mutex::new(false)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Configure the raw token body returned by `refresh_access_token`.
    pub fn set_refresh_response(&self, body: Value) {
        *self.refresh_response.lock().unwrap() = Some(body);
    }

    /// Configure the raw token body returned by `exchange_authorization_code`.
    pub fn set_exchange_response(&self, body: Value) {
        *self.exchange_response.lock().unwrap() = Some(body);
    }

    /// Force every grant to fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Sleep this long inside each grant, to widen race windows.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of refresh grants attempted.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of code exchanges attempted.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Reset internal state.
    pub fn reset(&self) {
        self.refresh_calls.store(0, Ordering::SeqCst);
        self.exchange_calls.store(0, Ordering::SeqCst);
        *self.refresh_response.lock().unwrap() = None;
        *self.exchange_response.lock().unwrap() = None;
        *self.should_fail.lock().unwrap() = false;
        *self.delay.lock().unwrap() = None;
    }

    async fn respond(&self, configured: &Mutex<Option<Value>>) -> Result<TokenPayload, OAuthFlowError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.should_fail.lock().unwrap() {
            return Err(OAuthFlowError::TokenExchangeFailed { reason: "invalid_grant".into() });
        }

        let body = configured.lock().unwrap().clone().unwrap_or_else(|| {
            json!({
                "access_token": "mock_access_token",
                "refresh_token": "mock_refresh_token",
                "expires_in": 3600
            })
        });
        TokenPayload::from_value(&body).map_err(|reason| OAuthFlowError::TokenExchangeFailed { reason })
    }
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn exchange_authorization_code(
        &self,
        _session_id: &str,
        _code: &str,
        _returned_state: &str,
        _client: &ClientCredentials,
        _redirect_uri: &str,
    ) -> Result<TokenPayload, OAuthFlowError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.exchange_response).await
    }

    async fn refresh_access_token(
        &self,
        credential: &Credential,
        _client: &ClientCredentials,
    ) -> Result<TokenPayload, OAuthFlowError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if credential.refresh_token.is_none() {
            return Err(OAuthFlowError::NoRefreshToken);
        }
        self.respond(&self.refresh_response).await
    }
}
