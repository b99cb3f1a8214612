//! Binary entrypoint for the easylock HTTP server.
//!
//! See [`easylock_server::config`] for the environment variables it reads.

use std::error::Error;

use tokio_util::sync::CancellationToken;

use easylock_server::config::ServerConfig;
use easylock_server::router::build_router;
use easylock_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let shutdown = CancellationToken::new();
    let state = AppState::new(shutdown.clone());
    let app = build_router(state);

    let addr = config.bind_addr();
    tracing::info!("easylock server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = {
        let shutdown = shutdown.clone();
        let grace = config.shutdown_grace;
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested, draining for {:?}", grace);
            // Blocked lock calls fail with 503 once the grace period is over.
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                shutdown.cancel();
            });
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await?;
    shutdown.cancel();
    tracing::info!("easylock server stopped");
    Ok(())
}
