//! OAuth 2.0 + PKCE infrastructure for the OpenProject connection
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │      TokenStore      │  per-principal credential, refresh-ahead,
//! └──────────┬───────────┘  serialized refresh
//!            │
//!            ├──► OAuthExchangeClient  (code exchange, refresh grant)
//!            │         │
//!            │         └──► PkceStateStore  (session-keyed, single use, TTL)
//!            │
//!            └──► ConfigRepository     (injected persistence)
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: [`Credential`], [`AuthMode`], [`TokenPayload`],
//!   [`ClientCredentials`]
//! - **[`pkce`]**: verifier/challenge/state generation and validation
//! - **[`state`]**: persistence of pending exchanges
//! - **[`client`]**: token endpoint client
//! - **[`token_store`]**: credential lifecycle
//! - **[`traits`]**: seams for mocking the token endpoint

pub mod client;
pub mod pkce;
pub mod state;
pub mod token_store;
pub mod traits;
pub mod types;

pub use client::{AuthorizationRequest, OAuthExchangeClient, OAuthFlowError};
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, is_valid_code_verifier,
    PkceExchangeState,
};
pub use state::PkceStateStore;
pub use token_store::{load_client_credentials, TokenStore, TokenStoreError};
pub use traits::OAuthClientTrait;
pub use types::{AuthMode, ClientCredentials, Credential, OAuthError, TokenPayload};
