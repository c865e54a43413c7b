use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tracing_subscriber::EnvFilter;

use bible_search::api;
use bible_search::config::Config;
use bible_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Keyword backend: {:?}", config.keyword_backend);

    let state = AppState::new(config.clone())?;

    if let Some(local) = state.local_vectors.clone() {
        let interval = config.vector.reload_interval_secs;
        if interval > 0 {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(interval));
                ticker.tick().await; // first tick is immediate
                loop {
                    ticker.tick().await;
                    let index = local.clone();
                    match tokio::task::spawn_blocking(move || index.reload()).await {
                        Ok(Ok(count)) => tracing::debug!("Reloaded {count} vector entries"),
                        Ok(Err(e)) => tracing::warn!("Vector export reload failed: {e:#}"),
                        Err(e) => tracing::warn!("Vector export reload task failed: {e}"),
                    }
                }
            });
        }
    }

    let app = Router::new()
        .route("/search", get(api::search::search))
        .route("/health", get(api::health::health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
