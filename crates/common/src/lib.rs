//! Shared building blocks for the OpenProject integration crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: settings validation, storage errors and key names
//! - `runtime`: the [`storage::ConfigRepository`] port and its in-memory
//!   implementation
//! - `platform`: OAuth 2.0 + PKCE and the credential lifecycle
//! - `test-utils`: mocks and fixtures for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod storage;
#[cfg(feature = "foundation")]
pub mod validation;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "platform")))]
pub mod testing;

#[cfg(feature = "platform")]
pub use auth::{AuthMode, ClientCredentials, Credential, TokenStore, TokenStoreError};
#[cfg(feature = "runtime")]
pub use storage::{ConfigRepository, InMemoryConfigRepository, Scope};
#[cfg(feature = "foundation")]
pub use storage::{StorageError, StorageResult};
#[cfg(feature = "foundation")]
pub use validation::{SettingsError, SettingsValidator};
