//! Testing utilities and helpers
//!
//! - **[`mocks`]**: mock token endpoint client
//! - **[`fixtures`]**: ready-made settings and token payloads
//!
//! In-memory persistence lives in [`crate::storage::InMemoryConfigRepository`].

pub mod fixtures;
pub mod mocks;

pub use fixtures::{oauth2_admin_settings, oidc_admin_settings, seed_oauth2_settings, token_body};
pub use mocks::MockOAuthClient;
