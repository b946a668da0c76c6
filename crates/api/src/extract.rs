//! Caller identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";
pub const SESSION_HEADER: &str = "x-session-id";

/// The user a request acts for, and the browser session it belongs to.
///
/// The session falls back to the user id when no session header is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub session_id: String,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &'static str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_HEADER).ok_or(ApiError::MissingPrincipal)?;
        let session_id = header(SESSION_HEADER).unwrap_or_else(|| user_id.clone());
        Ok(Self { user_id, session_id })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<Principal, ApiError> {
        let (mut parts, ()) = request.into_parts();
        Principal::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn session_defaults_to_user() {
        let request = Request::builder().header(USER_HEADER, "alice").body(()).unwrap();
        let principal = extract(request).await.unwrap();
        assert_eq!(principal, Principal { user_id: "alice".into(), session_id: "alice".into() });
    }

    #[tokio::test]
    async fn blank_user_header_is_rejected() {
        let request = Request::builder().header(USER_HEADER, "  ").body(()).unwrap();
        assert!(matches!(extract(request).await, Err(ApiError::MissingPrincipal)));
    }

    #[tokio::test]
    async fn explicit_session_is_used() {
        let request =
            Request::builder().header(USER_HEADER, "alice").header(SESSION_HEADER, "s-42").body(()).unwrap();
        assert_eq!(extract(request).await.unwrap().session_id, "s-42");
    }
}
