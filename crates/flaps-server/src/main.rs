//! # Flaps Server
//!
//! HTTP API server for Nubster Flaps: the wire adapters in front of the
//! decision engine (flaps-core) and storage layer (flaps-storage).

mod config;
mod error;
mod routes;
mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;

    tracing::info!("connecting to storage...");
    let state = AppState::build(&config).await?;

    let app = routes::router(state);

    tracing::info!(%bind_addr, "starting flaps server");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    tracing::info!("received shutdown signal");
}
