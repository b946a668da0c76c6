//! Settings handlers.

use axum::extract::State;
use axum::Json;
use openproject_infra::services::{AdminConfigOutcome, UserConfigOutcome};
use openproject_infra::IntegrationServices;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::Principal;

/// Body of both settings routes.
#[derive(Debug, Deserialize)]
pub struct ValuesBody {
    pub values: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse<T> {
    pub status: bool,
    #[serde(flatten)]
    pub outcome: T,
}

impl<T> SettingsResponse<T> {
    fn ok(outcome: T) -> Json<Self> {
        Json(Self { status: true, outcome })
    }
}

/// `PUT /admin-config`
#[instrument(skip_all)]
pub async fn set_admin_config(
    State(services): State<IntegrationServices>,
    Json(body): Json<ValuesBody>,
) -> Result<Json<SettingsResponse<AdminConfigOutcome>>, ApiError> {
    let outcome = services.settings.set_admin_config(&body.values).await?;
    Ok(SettingsResponse::ok(outcome))
}

/// `PUT /config`
#[instrument(skip_all, fields(user = %principal.user_id))]
pub async fn set_user_config(
    State(services): State<IntegrationServices>,
    principal: Principal,
    Json(body): Json<ValuesBody>,
) -> Result<Json<SettingsResponse<UserConfigOutcome>>, ApiError> {
    let outcome = services.settings.set_user_config(&principal.user_id, &body.values).await?;
    Ok(SettingsResponse::ok(outcome))
}
