pub mod config;
pub mod context;
pub mod db;
pub mod enums;
pub mod error;
pub mod filters;
pub mod forms;
pub mod logging;
pub mod models;
pub mod pages;
pub mod routes;
mod utils;
pub mod views;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

pub use config::{AppConfig, CliArgs};
pub use context::{AppContext, SharedContext};
pub use routes::router;

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<S>(ctx: SharedContext, listener: TcpListener, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let ctx = Arc::new(AppContext::new(config)?);
    ctx.initialize()
        .await
        .with_context(|| format!("failed to open database {:?}", ctx.database().path()))?;

    let addr = ctx.config().bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        database = ?ctx.database().path(),
        timezone = %ctx.tz(),
        "fyyur listening"
    );

    serve(ctx, listener, shutdown_signal()).await?;
    tracing::info!("fyyur stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
