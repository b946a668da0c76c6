//! Integration tests for auth module
//!
//! Exercises the PKCE connect flow against a mock token endpoint and the
//! credential lifecycle on top of the in-memory repository.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use openproject_common::auth::{
    generate_code_challenge, is_valid_code_verifier, load_client_credentials, AuthMode,
    OAuthExchangeClient, OAuthFlowError, PkceStateStore, TokenStore,
};
use openproject_common::storage::keys::user;
use openproject_common::storage::{ConfigRepository, InMemoryConfigRepository, Scope};
use openproject_common::testing::{seed_oauth2_settings, token_body, MockOAuthClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT_URI: &str = "https://cloud.example.com/apps/integration_openproject/oauth-redirect";

fn repository() -> Arc<dyn ConfigRepository> {
    Arc::new(InMemoryConfigRepository::new())
}

fn exchange_client(repo: &Arc<dyn ConfigRepository>) -> OAuthExchangeClient {
    OAuthExchangeClient::new(reqwest::Client::new(), PkceStateStore::new(Arc::clone(repo)))
}

/// Validates the complete connect flow from authorization URL to stored
/// credential.
///
/// # Test Steps
/// 1. Seed a client registration pointing at a mock OpenProject
/// 2. Build the authorization URL and pull the state out of it
/// 3. Exchange a code with that state; the token endpoint must see the
///    verifier whose S256 challenge was in the URL
/// 4. Store the returned payload and read it back through the token store
#[tokio::test(flavor = "multi_thread")]
async fn test_connect_flow_stores_credential() {
    let server = MockServer::start().await;
    let repo = repository();
    seed_oauth2_settings(repo.as_ref(), &server.uri()).await.expect("seed settings");
    let client = exchange_client(&repo);

    let request = client
        .build_authorization_request("session-1", "client-id", &server.uri(), REDIRECT_URI)
        .await
        .expect("authorization request");

    let url = url::Url::parse(&request.url).expect("valid authorization url");
    let challenge = url
        .query_pairs()
        .find(|(k, _)| k == "code_challenge")
        .map(|(_, v)| v.into_owned())
        .expect("challenge in url");

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", "refresh-1", 7200)))
        .expect(1)
        .mount(&server)
        .await;

    // Peek at the pending verifier before the exchange consumes it.
    let pending = repo
        .get(&Scope::session("session-1"), "pkce_exchange_state")
        .await
        .expect("read state")
        .expect("state persisted");
    let pending: serde_json::Value = serde_json::from_str(&pending).expect("state json");
    let verifier = pending["code_verifier"].as_str().expect("verifier");
    assert!(is_valid_code_verifier(verifier));
    assert_eq!(generate_code_challenge(verifier), challenge);

    let registration = load_client_credentials(repo.as_ref())
        .await
        .expect("read registration")
        .expect("registration present");
    let payload = client
        .exchange_authorization_code("session-1", "the-code", &request.state, &registration, REDIRECT_URI)
        .await
        .expect("code exchange");

    let store = TokenStore::new(Arc::new(MockOAuthClient::new()), Arc::clone(&repo));
    store.store_payload("alice", payload).await.expect("store credential");

    let credential = store.current("alice", true).await.expect("load").expect("credential");
    assert_eq!(credential.access_token, "access-1");
    assert_eq!(credential.auth_mode, AuthMode::OAuth);
    assert_eq!(credential.expires_in, Some(7200));
    assert!(!credential.is_expiring());
}

/// Validates that a pending state is single use.
///
/// # Test Steps
/// 1. Build an authorization request
/// 2. Attempt an exchange with a forged state (consumes the pending state)
/// 3. Retry with the genuine state and expect a mismatch as well
#[tokio::test(flavor = "multi_thread")]
async fn test_state_is_consumed_by_failed_attempt() {
    let server = MockServer::start().await;
    let repo = repository();
    let client = exchange_client(&repo);
    let registration = openproject_common::ClientCredentials::new(
        server.uri(),
        "client-id",
        "client-secret-0123456789",
    );

    let request = client
        .build_authorization_request("session-2", "client-id", &server.uri(), REDIRECT_URI)
        .await
        .expect("authorization request");

    let forged = client
        .exchange_authorization_code("session-2", "code", "forged-state", &registration, REDIRECT_URI)
        .await;
    assert!(matches!(forged, Err(OAuthFlowError::StateMismatch)));

    let replay = client
        .exchange_authorization_code("session-2", "code", &request.state, &registration, REDIRECT_URI)
        .await;
    assert!(matches!(replay, Err(OAuthFlowError::StateMismatch)));

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

/// Validates that a short client secret is rejected before any network call.
#[tokio::test(flavor = "multi_thread")]
async fn test_short_client_secret_is_rejected() {
    let server = MockServer::start().await;
    let repo = repository();
    let client = exchange_client(&repo);
    let registration = openproject_common::ClientCredentials::new(server.uri(), "client-id", "short");

    let request = client
        .build_authorization_request("session-3", "client-id", &server.uri(), REDIRECT_URI)
        .await
        .expect("authorization request");

    let result = client
        .exchange_authorization_code("session-3", "code", &request.state, &registration, REDIRECT_URI)
        .await;
    assert!(matches!(result, Err(OAuthFlowError::InvalidClientSecret)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

/// Validates refresh against a real token endpoint that does not rotate the
/// refresh token.
///
/// # Test Steps
/// 1. Store a credential whose half-life has already passed
/// 2. Ask for the current credential with refresh enabled
/// 3. Verify the new access token is stored and the old refresh token kept
#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_ahead_keeps_unrotated_refresh_token() {
    let server = MockServer::start().await;
    let repo = repository();
    seed_oauth2_settings(repo.as_ref(), &server.uri()).await.expect("seed settings");

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-new",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = TokenStore::new(Arc::new(exchange_client(&repo)), Arc::clone(&repo));
    store
        .store("bob", &token_body("access-old", "refresh-old", 3600))
        .await
        .expect("store credential");

    // Age the credential past its half-life.
    let aged = (chrono::Utc::now() - chrono::Duration::seconds(2000)).to_rfc3339();
    repo.set(&Scope::user("bob"), user::TOKEN_CREATED_AT, &aged).await.expect("age credential");

    let credential = store.current("bob", true).await.expect("current").expect("credential");
    assert_eq!(credential.access_token, "access-new");
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-old"));
}

/// Validates that rotating the client registration can wipe every user.
#[tokio::test(flavor = "multi_thread")]
async fn test_clear_all_removes_every_user_credential() {
    let repo = repository();
    let store = TokenStore::new(Arc::new(MockOAuthClient::new()), Arc::clone(&repo));

    store.store("alice", &token_body("a", "ra", 3600)).await.expect("store alice");
    store.store_api_key("bob", "api-key").await.expect("store bob");

    assert_eq!(store.clear_all().await.expect("clear all"), 2);
    assert!(store.load("alice").await.expect("load alice").is_none());
    assert!(store.load("bob").await.expect("load bob").is_none());
}
