//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use openproject_infra::ServiceError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Error returned by a route handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `X-User-Id` header on a route that acts for a user.
    #[error("Missing user identity")]
    MissingPrincipal,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::MissingPrincipal => 401,
            Self::Service(err) => err.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::MissingPrincipal => json!({ "error": "missing_principal", "message": self.to_string() }),
            // Remote failures keep the `{error, statusCode}` shape callers branch on.
            Self::Service(ServiceError::Request(err)) => err.to_payload(),
            Self::Service(err) => json!({ "error": err.kind(), "message": err.to_string() }),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
