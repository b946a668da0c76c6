//! Service layer
//!
//! - [`oauth_flow`]: the OAuth connect journey
//! - [`settings`]: admin and per-user settings writes
//! - [`notifications`]: unread notification counts
//! - [`user_info`]: remote identity of a connected user
//!
//! [`IntegrationServices`] wires them over one repository and one HTTP
//! client.

pub mod error;
pub mod notifications;
pub mod oauth_flow;
pub mod settings;
pub mod user_info;

use std::sync::Arc;

use openproject_common::auth::{OAuthExchangeClient, PkceStateStore, TokenStore};
use openproject_common::storage::ConfigRepository;
use openproject_domain::{Config, IntegrationError};

pub use error::ServiceError;
pub use notifications::{HousekeepingReport, NotificationSweep, SweepReport};
pub use oauth_flow::{ConnectionFlash, OAuthConnectService};
pub use settings::{AdminConfigOutcome, SettingsService, UserConfigOutcome};
pub use user_info::UserInfo;

use crate::api::OpenProjectClient;
use crate::http::HttpClient;

/// Every service, sharing one token store.
#[derive(Clone)]
pub struct IntegrationServices {
    pub repository: Arc<dyn ConfigRepository>,
    pub client: Arc<OpenProjectClient>,
    pub oauth: Arc<OAuthConnectService>,
    pub settings: Arc<SettingsService>,
    pub notifications: Arc<NotificationSweep>,
}

impl IntegrationServices {
    /// Build the services from application configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(repository: Arc<dyn ConfigRepository>, config: &Config) -> Result<Self, IntegrationError> {
        let http = HttpClient::from_config(&config.http)?;
        Ok(Self::assemble(repository, http, config.server.redirect_uri()))
    }

    /// Build the services with a default HTTP client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn with_defaults(
        repository: Arc<dyn ConfigRepository>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, IntegrationError> {
        Ok(Self::assemble(repository, HttpClient::new()?, redirect_uri.into()))
    }

    fn assemble(repository: Arc<dyn ConfigRepository>, http: HttpClient, redirect_uri: String) -> Self {
        let exchange =
            Arc::new(OAuthExchangeClient::new(http.inner(), PkceStateStore::new(Arc::clone(&repository))));
        let tokens = Arc::new(TokenStore::new(Arc::clone(&exchange), Arc::clone(&repository)));
        let client = Arc::new(OpenProjectClient::new(http, tokens, Arc::clone(&repository)));

        Self {
            oauth: Arc::new(OAuthConnectService::new(
                exchange,
                Arc::clone(&client),
                Arc::clone(&repository),
                redirect_uri,
            )),
            settings: Arc::new(SettingsService::new(Arc::clone(&repository), Arc::clone(&client))),
            notifications: Arc::new(NotificationSweep::new(Arc::clone(&client), Arc::clone(&repository))),
            client,
            repository,
        }
    }
}
