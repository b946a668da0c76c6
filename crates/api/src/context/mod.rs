//! Application context - dependency injection container

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use openproject_common::storage::ConfigRepository;
use openproject_domain::{Config, IntegrationError, Result};
use openproject_infra::scheduling::{NotificationScheduler, NotificationSchedulerConfig};
use openproject_infra::{DbManager, IntegrationServices, SqliteConfigRepository};
use tracing::{info, warn};

/// Everything the server needs at runtime.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub services: IntegrationServices,
    scheduler: Option<NotificationScheduler>,
}

impl AppContext {
    /// Open the database, apply the schema and wire the services.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated, or the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = Path::new(&config.database.path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                IntegrationError::Config(format!("cannot create database directory {}: {err}", parent.display()))
            })?;
        }

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;
        info!(path = %db.path().display(), "database ready");

        let repository: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigRepository::new(Arc::clone(&db)));
        let services = IntegrationServices::new(repository, &config)?;

        Ok(Self { config, db, services, scheduler: None })
    }

    /// Start background jobs enabled in the configuration.
    ///
    /// # Errors
    /// Returns error if a job is already running.
    pub async fn start_background(&mut self) -> Result<()> {
        if !self.config.notifications.enabled {
            info!("notification sweep disabled");
            return Ok(());
        }

        let mut scheduler = NotificationScheduler::new(
            Arc::clone(&self.services.notifications),
            NotificationSchedulerConfig {
                interval: Duration::from_secs(self.config.notifications.interval_seconds),
                ..NotificationSchedulerConfig::default()
            },
        );
        scheduler.start().await?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Stop background jobs.
    pub async fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            if let Err(err) = scheduler.stop().await {
                warn!(error = %err, "notification scheduler did not stop cleanly");
            }
        }
    }
}
