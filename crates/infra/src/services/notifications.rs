//! Unread notification counts for connected users.

use std::sync::Arc;

use openproject_common::auth::{AuthMode, PkceStateStore};
use openproject_common::storage::keys::user;
use openproject_common::storage::{ConfigRepository, Scope};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ServiceError;
use crate::api::{OpenProjectClient, RequestError, RequestParams};

/// Totals of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Stale state removed by [`NotificationSweep::housekeeping`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HousekeepingReport {
    pub pkce_states: usize,
    pub refresh_locks: usize,
}

/// Refreshes the stored unread notification count of every connected user.
pub struct NotificationSweep {
    client: Arc<OpenProjectClient>,
    repository: Arc<dyn ConfigRepository>,
    states: PkceStateStore,
}

impl NotificationSweep {
    pub fn new(client: Arc<OpenProjectClient>, repository: Arc<dyn ConfigRepository>) -> Self {
        let states = PkceStateStore::new(Arc::clone(&repository));
        Self { client, repository, states }
    }

    /// Remove abandoned PKCE exchanges and idle refresh locks.
    ///
    /// # Errors
    /// Returns error if the session state cannot be listed or deleted.
    #[instrument(skip_all)]
    pub async fn housekeeping(&self) -> Result<HousekeepingReport, ServiceError> {
        let report = HousekeepingReport {
            pkce_states: self.states.purge_expired().await?,
            refresh_locks: self.client.tokens().prune_idle_locks(),
        };
        debug!(pkce_states = report.pkce_states, refresh_locks = report.refresh_locks, "housekeeping finished");
        Ok(report)
    }

    /// Visit every principal holding a credential.
    ///
    /// A failing user is logged and counted; the sweep moves on. Cancelling
    /// stops before the next user.
    ///
    /// # Errors
    /// Returns error only when the list of principals cannot be read.
    #[instrument(skip_all)]
    pub async fn sweep(&self, cancel: &CancellationToken) -> Result<SweepReport, ServiceError> {
        let principals = self.repository.principals_with_key(user::TOKEN).await?;
        let mut report = SweepReport::default();

        for principal in principals {
            if cancel.is_cancelled() {
                debug!("notification sweep cancelled");
                break;
            }
            report.checked += 1;
            match self.refresh_count(&principal, cancel).await {
                Ok(count) => {
                    report.updated += 1;
                    debug!(principal = %principal, count, "notification count updated");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(principal = %principal, error = %err, "notification count refresh failed");
                }
            }
        }

        info!(checked = report.checked, updated = report.updated, failed = report.failed, "notification sweep finished");
        Ok(report)
    }

    async fn refresh_count(&self, principal: &str, cancel: &CancellationToken) -> Result<u64, ServiceError> {
        let auth_mode = match self.client.tokens().load(principal).await? {
            Some(credential) => credential.auth_mode,
            None => AuthMode::OAuth,
        };

        let params = RequestParams::new()
            .with("pageSize", 1)
            .with("filters", unread_filter());
        let body = self.client.request(principal, "notifications", &params, Method::GET, auth_mode, cancel).await?;

        let count = body
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| RequestError::network("notifications response has no total"))?;

        self.repository.set(&Scope::user(principal), user::NOTIFICATION_COUNT, &count.to_string()).await?;
        Ok(count)
    }
}

fn unread_filter() -> String {
    json!([{ "readIAN": { "operator": "=", "values": ["f"] } }]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_selects_unread_notifications() {
        let filter: Value = serde_json::from_str(&unread_filter()).unwrap();
        assert_eq!(filter[0]["readIAN"]["values"][0], "f");
    }
}
