//! Service layer errors.

use openproject_common::auth::{OAuthFlowError, TokenStoreError};
use openproject_common::storage::StorageError;
use openproject_common::validation::SettingsError;
use openproject_domain::IntegrationError;
use thiserror::Error;

use crate::api::RequestError;
use crate::errors::InfraError;

/// Failure of a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Integration is not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    OAuth(#[from] OAuthFlowError),

    #[error(transparent)]
    Tokens(#[from] TokenStoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// HTTP status an inbound handler answers with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Settings(_) | Self::NotConfigured(_) => 400,
            Self::Request(err) if err.is_unauthorized() => 401,
            Self::Request(_) => 502,
            Self::OAuth(_) => 400,
            Self::Tokens(_) | Self::Storage(_) => 500,
        }
    }

    /// Stable machine-readable label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Settings(err) => err.kind(),
            Self::NotConfigured(_) => "not_configured",
            Self::Request(_) => "request_failed",
            Self::OAuth(_) => "oauth_failed",
            Self::Tokens(_) => "token_store",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<ServiceError> for IntegrationError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Settings(err) => InfraError::from(err).into(),
            ServiceError::NotConfigured(msg) => IntegrationError::Config(msg),
            ServiceError::Request(err) if err.is_unauthorized() => IntegrationError::Auth(err.to_string()),
            ServiceError::Request(err) => IntegrationError::Network(err.to_string()),
            ServiceError::OAuth(err) => InfraError::from(err).into(),
            ServiceError::Tokens(err) => InfraError::from(err).into(),
            ServiceError::Storage(err) => InfraError::from(err).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_errors_are_client_errors() {
        let err = ServiceError::from(SettingsError::UnknownSetting { key: "x".into() });
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.kind(), "unknown_setting");
    }

    #[test]
    fn unauthorized_requests_map_to_auth() {
        let err = ServiceError::from(RequestError::Unauthorized { status: 401, message: "m".into() });
        assert_eq!(err.status_code(), 401);
        assert!(matches!(IntegrationError::from(err), IntegrationError::Auth(_)));
    }
}
