//! OAuth connect journey handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use openproject_infra::IntegrationServices;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::Principal;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub starting_page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// `GET /oauth-connect`: send the browser to OpenProject's consent page.
#[instrument(skip_all, fields(user = %principal.user_id))]
pub async fn connect(
    State(services): State<IntegrationServices>,
    principal: Principal,
    Query(params): Query<ConnectParams>,
) -> Result<Redirect, ApiError> {
    let url = services
        .oauth
        .start_connect(&principal.user_id, &principal.session_id, params.starting_page.as_deref())
        .await?;
    Ok(Redirect::to(&url))
}

/// `GET /oauth-redirect`: OpenProject sends the browser back here.
///
/// Always redirects; the outcome is left as a one-time marker.
#[instrument(skip_all, fields(user = %principal.user_id))]
pub async fn redirect(
    State(services): State<IntegrationServices>,
    principal: Principal,
    Query(params): Query<RedirectParams>,
) -> Redirect {
    let destination = services
        .oauth
        .handle_redirect(
            &principal.user_id,
            &principal.session_id,
            params.code.as_deref().unwrap_or_default(),
            params.state.as_deref().unwrap_or_default(),
        )
        .await;
    Redirect::to(&destination)
}

/// `GET /flash`: consume the marker left by the last connect attempt.
pub async fn flash(State(services): State<IntegrationServices>, principal: Principal) -> Result<Response, ApiError> {
    Ok(match services.oauth.take_flash(&principal.user_id).await? {
        Some(flash) => Json(flash).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
