//! OpenProject integration server entry point.

use anyhow::Context;
use openproject_server::utils::logging::init_tracing;
use openproject_server::{build_router, AppContext};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = openproject_infra::config::load().context("loading configuration")?;
    init_tracing(&config.logging);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => warn!(error = %err, "no .env file loaded"),
    }

    let mut ctx = AppContext::new(config).context("initialising application context")?;
    ctx.start_background().await.context("starting background jobs")?;

    let bind_address = ctx.config.server.bind_address.clone();
    let listener = TcpListener::bind(&bind_address).await.with_context(|| format!("binding {bind_address}"))?;
    info!(address = %bind_address, redirect_uri = %ctx.config.server.redirect_uri(), "listening");

    axum::serve(listener, build_router(ctx.services.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    ctx.shutdown().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
