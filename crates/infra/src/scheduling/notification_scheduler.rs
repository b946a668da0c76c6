//! Periodic notification count refresh.
//!
//! Wraps [`NotificationSweep`] in a background task with explicit
//! start/stop. The sweep runs once per interval, followed by a housekeeping
//! pass over stale session state; a cancelled scheduler stops between users.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};
use crate::services::NotificationSweep;

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the notification scheduler
#[derive(Debug, Clone)]
pub struct NotificationSchedulerConfig {
    /// Time between two sweeps
    pub interval: Duration,
    /// Upper bound for a single sweep
    pub sweep_timeout: Duration,
    /// How long `stop` waits for the task to finish
    pub join_timeout: Duration,
}

impl Default for NotificationSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            sweep_timeout: Duration::from_secs(120),
            join_timeout: Duration::from_secs(5),
        }
    }
}

pub struct NotificationScheduler {
    sweep: Arc<NotificationSweep>,
    config: NotificationSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl NotificationScheduler {
    pub fn new(sweep: Arc<NotificationSweep>, config: NotificationSchedulerConfig) -> Self {
        Self {
            sweep,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the background loop.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation_token = CancellationToken::new();
        let sweep = Arc::clone(&self.sweep);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sweep_loop(sweep, config, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(interval_secs = self.config.interval.as_secs(), "Notification scheduler started");
        Ok(())
    }

    /// Cancel the background loop and wait for it.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the task does not finish
    /// in time
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Notification scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn sweep_loop(sweep: Arc<NotificationSweep>, config: NotificationSchedulerConfig, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Notification loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    let started = Instant::now();
                    match tokio::time::timeout(config.sweep_timeout, sweep.sweep(&cancel)).await {
                        Ok(Ok(report)) => {
                            debug!(?report, elapsed_ms = started.elapsed().as_millis() as u64, "Notification sweep completed");
                        }
                        Ok(Err(err)) => error!(error = %err, "Notification sweep failed"),
                        Err(_) => error!(timeout_secs = config.sweep_timeout.as_secs(), "Notification sweep timed out"),
                    }
                    if let Err(err) = sweep.housekeeping().await {
                        warn!(error = %err, "Housekeeping failed");
                    }
                }
            }
        }
    }
}
