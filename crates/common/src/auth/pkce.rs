//! PKCE (Proof Key for Code Exchange) for the authorization-code flow
//!
//! Implements RFC 7636 with the `S256` method. A verifier and a state nonce
//! are minted per connect attempt; only the challenge leaves the server until
//! the code is exchanged.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unreserved-character verifier alphabet, 43 to 128 characters.
pub const CODE_VERIFIER_PATTERN: &str = r"^[A-Za-z0-9\-._~]{43,128}$";

/// Shortest state nonce accepted back from the authorization server.
pub const MIN_STATE_LENGTH: usize = 9;

static CODE_VERIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(CODE_VERIFIER_PATTERN).expect("CODE_VERIFIER_REGEX should compile - this is a bug")
});

/// Generate a cryptographically secure code verifier
///
/// 32 random bytes, base64url without padding: 43 characters.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token(32)
}

/// Derive the challenge: `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state nonce for CSRF protection.
#[must_use]
pub fn generate_state() -> String {
    random_token(32)
}

/// Whether `verifier` matches [`CODE_VERIFIER_PATTERN`].
#[must_use]
pub fn is_valid_code_verifier(verifier: &str) -> bool {
    CODE_VERIFIER_REGEX.is_match(verifier)
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Pending authorization-code exchange for one session.
///
/// Persisted as JSON between the connect redirect and the callback, and
/// consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceExchangeState {
    pub state: String,
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

impl PkceExchangeState {
    /// Mint a fresh verifier/state pair.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    #[must_use]
    pub fn generate_at(created_at: DateTime<Utc>) -> Self {
        Self { state: generate_state(), code_verifier: generate_code_verifier(), created_at }
    }

    /// Challenge sent with the authorization request.
    #[must_use]
    pub fn code_challenge(&self) -> String {
        generate_code_challenge(&self.code_verifier)
    }

    /// Always `S256`.
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }

    /// Whether the record outlived `ttl` at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.created_at.checked_add_signed(ttl).is_some_and(|deadline| now <= deadline)
    }

    /// The stored state is long enough and equals what came back.
    #[must_use]
    pub fn matches_state(&self, returned_state: &str) -> bool {
        self.state.len() >= MIN_STATE_LENGTH && self.state == returned_state
    }
}
