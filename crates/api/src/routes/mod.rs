//! Inbound HTTP surface.

pub mod config;
pub mod oauth;

use axum::routing::{get, put};
use axum::Router;
use openproject_domain::constants::OAUTH_REDIRECT_ROUTE;
use openproject_infra::IntegrationServices;

/// Build the axum `Router` with every integration route.
pub fn build_router(services: IntegrationServices) -> Router {
    Router::new()
        // OAuth connect journey
        .route("/oauth-connect", get(oauth::connect))
        .route(OAUTH_REDIRECT_ROUTE, get(oauth::redirect))
        .route("/flash", get(oauth::flash))
        // Settings
        .route("/admin-config", put(config::set_admin_config))
        .route("/config", put(config::set_user_config))
        .with_state(services)
}
