//! Remote API request errors
//!
//! Every outcome of an authenticated request that is not a successful
//! response falls into one of three kinds. Callers branch on the kind; the
//! only automatic recovery is the refresh-and-retry inside the client.

use serde_json::{json, Value};
use thiserror::Error;

/// Status reported to callers for connection-level failures.
///
/// An unreachable instance is reported as "not found" to stay compatible with
/// existing consumers of the error payload. Nothing else uses this value.
const UNREACHABLE_STATUS: u16 = 404;

/// Failure of a request against the OpenProject API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The remote API answered with an error status. Details are not leaked.
    #[error("Bad credentials (HTTP {status})")]
    BadCredentials { status: u16 },

    /// The request never produced a response: DNS, connect, timeout,
    /// cancellation or a missing instance URL.
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// The credential was rejected and could not be renewed.
    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },
}

impl RequestError {
    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Status code carried in the error payload.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadCredentials { status } | Self::Unauthorized { status, .. } => *status,
            Self::NetworkError { .. } => UNREACHABLE_STATUS,
        }
    }

    /// `{error, statusCode}` payload handed to the UI layer.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let error = match self {
            Self::BadCredentials { .. } => "Bad credentials".to_string(),
            Self::NetworkError { message } | Self::Unauthorized { message, .. } => message.clone(),
        };
        json!({ "error": error, "statusCode": self.status_code() })
    }

    /// Whether the caller should treat the user as disconnected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
