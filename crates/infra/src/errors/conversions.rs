//! Conversions from external infrastructure errors into domain errors.

use openproject_common::auth::{OAuthFlowError, TokenStoreError};
use openproject_common::storage::StorageError;
use openproject_common::validation::SettingsError;
use openproject_domain::IntegrationError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub IntegrationError);

impl From<InfraError> for IntegrationError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<IntegrationError> for InfraError {
    fn from(value: IntegrationError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoIntegrationError {
    fn into_integration(self) -> IntegrationError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → IntegrationError */
/* -------------------------------------------------------------------------- */

impl IntoIntegrationError for SqlError {
    fn into_integration(self) -> IntegrationError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => IntegrationError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => IntegrationError::Database("database is locked".into()),
                    ErrorCode::ConstraintViolation => {
                        IntegrationError::Database(format!("constraint violation: {message}"))
                    }
                    _ => IntegrationError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => IntegrationError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                IntegrationError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => IntegrationError::Database(format!("invalid column type: {ty}")),
            RE::InvalidPath(path) => {
                IntegrationError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            other => IntegrationError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_integration())
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(IntegrationError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → IntegrationError */
/* -------------------------------------------------------------------------- */

impl IntoIntegrationError for HttpError {
    fn into_integration(self) -> IntegrationError {
        if self.is_timeout() {
            return IntegrationError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return IntegrationError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message = format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => IntegrationError::Auth(message),
                404 => IntegrationError::NotFound(message),
                400..=499 => IntegrationError::InvalidInput(message),
                _ => IntegrationError::Network(message),
            };
        }

        IntegrationError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_integration())
    }
}

/* -------------------------------------------------------------------------- */
/* shared library errors → IntegrationError */
/* -------------------------------------------------------------------------- */

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(IntegrationError::Database(value.to_string()))
    }
}

impl From<OAuthFlowError> for InfraError {
    fn from(value: OAuthFlowError) -> Self {
        let error = match value {
            OAuthFlowError::Storage(err) => return err.into(),
            OAuthFlowError::RequestFailed(err) => return err.into(),
            other => IntegrationError::Auth(other.to_string()),
        };
        InfraError(error)
    }
}

impl From<TokenStoreError> for InfraError {
    fn from(value: TokenStoreError) -> Self {
        match value {
            TokenStoreError::Storage(err) => err.into(),
            TokenStoreError::Refresh(err) => err.into(),
            TokenStoreError::NotConfigured => {
                InfraError(IntegrationError::Config("OpenProject OAuth client is not configured".into()))
            }
            other => InfraError(IntegrationError::Auth(other.to_string())),
        }
    }
}

impl From<SettingsError> for InfraError {
    fn from(value: SettingsError) -> Self {
        InfraError(IntegrationError::InvalidInput(value.to_string()))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: IntegrationError = InfraError::from(err).into();
        match mapped {
            IntegrationError::Database(msg) => assert!(msg.contains("busy")),
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: IntegrationError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, IntegrationError::NotFound(_)));
    }

    #[test]
    fn settings_errors_are_invalid_input() {
        let mapped: IntegrationError = InfraError::from(SettingsError::MissingOrInvalidAuthMethod).into();
        assert!(matches!(mapped, IntegrationError::InvalidInput(_)));
    }

    #[test]
    fn unconfigured_token_store_is_config_error() {
        let mapped: IntegrationError = InfraError::from(TokenStoreError::NotConfigured).into();
        assert!(matches!(mapped, IntegrationError::Config(_)));
    }

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: IntegrationError = InfraError::from(error).into();
        match mapped {
            IntegrationError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }
}
