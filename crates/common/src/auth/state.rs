//! Session-keyed persistence of pending PKCE exchanges.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;

use super::pkce::PkceExchangeState;
use crate::storage::keys::session::PKCE_STATE;
use crate::storage::{ConfigRepository, Scope, StorageResult};

/// Default lifetime of a pending exchange.
pub const DEFAULT_PKCE_TTL_SECONDS: i64 = 600;

/// Stores one pending [`PkceExchangeState`] per session, with a TTL.
#[derive(Clone)]
pub struct PkceStateStore {
    repository: Arc<dyn ConfigRepository>,
    ttl: Duration,
}

impl PkceStateStore {
    pub fn new(repository: Arc<dyn ConfigRepository>) -> Self {
        Self { repository, ttl: Duration::seconds(DEFAULT_PKCE_TTL_SECONDS) }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Replace the pending exchange for `session_id`.
    pub async fn save(&self, session_id: &str, state: &PkceExchangeState) -> StorageResult<()> {
        let encoded = serde_json::to_string(state)?;
        self.repository.set(&Scope::session(session_id), PKCE_STATE, &encoded).await
    }

    /// Remove and return the pending exchange.
    ///
    /// The record is deleted before it is inspected, so it can never be used
    /// twice. Expired or unreadable records yield `None`.
    pub async fn take(&self, session_id: &str) -> StorageResult<Option<PkceExchangeState>> {
        let scope = Scope::session(session_id);
        let raw = self.repository.get(&scope, PKCE_STATE).await?;
        self.repository.delete(&scope, PKCE_STATE).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let state: PkceExchangeState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                debug!(session_id, error = %err, "discarding unreadable pkce state");
                return Ok(None);
            }
        };

        if state.is_expired_at(Utc::now(), self.ttl) {
            debug!(session_id, "discarding expired pkce state");
            return Ok(None);
        }

        Ok(Some(state))
    }

    /// Delete every pending exchange that is expired or unreadable.
    ///
    /// Sessions abandoned mid-connect never reach [`take`](Self::take); their
    /// rows are only removed here. Returns how many were removed.
    pub async fn purge_expired(&self) -> StorageResult<usize> {
        let now = Utc::now();
        let mut purged = 0;

        for session_id in self.repository.sessions_with_key(PKCE_STATE).await? {
            let scope = Scope::session(session_id);
            let Some(raw) = self.repository.get(&scope, PKCE_STATE).await? else {
                continue;
            };
            let live = serde_json::from_str::<PkceExchangeState>(&raw)
                .is_ok_and(|state| !state.is_expired_at(now, self.ttl));
            if !live {
                self.repository.delete(&scope, PKCE_STATE).await?;
                purged += 1;
            }
        }

        if purged > 0 {
            debug!(purged, "purged stale pkce states");
        }
        Ok(purged)
    }
}
