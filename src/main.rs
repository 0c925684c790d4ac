use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use rag_assistant::core::config::{AppPaths, ConfigService};
use rag_assistant::core::logging;
use rag_assistant::server;
use rag_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone());
    let settings = config
        .load_settings()
        .with_context(|| format!("Invalid configuration in {}", config.config_path().display()))?;
    logging::init(&paths, &settings.logging);

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState::initialize(paths, config, settings).context("Failed to initialize")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutting down");
}
