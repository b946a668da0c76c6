//! Key-value settings repository abstraction.
//!
//! Every piece of persisted state (admin settings, per-user credentials and
//! preferences, PKCE exchange state) is addressed by a [`Scope`] and a string
//! key. Implementations only need `get`/`set`/`delete` plus reverse lookups
//! used when credentials must be wiped for every user at once and when stale
//! session state is swept.

use std::fmt;

use async_trait::async_trait;

use super::error::StorageResult;

/// Namespace a setting belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Application-wide (admin) settings.
    App,
    /// Settings owned by a single user.
    User(String),
    /// Short-lived state bound to a browser session.
    Session(String),
}

impl Scope {
    /// Convenience constructor for a user scope.
    pub fn user(principal: impl Into<String>) -> Self {
        Self::User(principal.into())
    }

    /// Convenience constructor for a session scope.
    pub fn session(session_id: impl Into<String>) -> Self {
        Self::Session(session_id.into())
    }

    /// Stable kind label, used as a column value by durable backends.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::User(_) => "user",
            Self::Session(_) => "session",
        }
    }

    /// Owner identifier (empty for the application scope).
    #[must_use]
    pub fn owner(&self) -> &str {
        match self {
            Self::App => "",
            Self::User(id) | Self::Session(id) => id,
        }
    }

    /// Rebuild a scope from its `(kind, owner)` pair.
    #[must_use]
    pub fn from_parts(kind: &str, owner: &str) -> Option<Self> {
        match kind {
            "app" => Some(Self::App),
            "user" => Some(Self::User(owner.to_string())),
            "session" => Some(Self::Session(owner.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::Session(id) => write!(f, "session:{id}"),
        }
    }
}

/// Persistence port for settings and credentials.
///
/// Implementations must be safe to share across request handlers.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Read a value. Absent keys yield `Ok(None)`.
    async fn get(&self, scope: &Scope, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, scope: &Scope, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, scope: &Scope, key: &str) -> StorageResult<()>;

    /// List the user principals that currently hold `key`.
    async fn principals_with_key(&self, key: &str) -> StorageResult<Vec<String>>;

    /// List the session ids that currently hold `key`.
    async fn sessions_with_key(&self, key: &str) -> StorageResult<Vec<String>>;
}
