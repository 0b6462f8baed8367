//! memotrack server.
//!
//! - Memo API under /api
//! - Liveness at /health, Prometheus scrape at /metrics
//! - Active-memo gauge refreshed in the background
//! - Graceful shutdown on Ctrl-C

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use memotrack_core::error::{MemoTrackError, Result};
use memotrack_server::{app_state, config, memo, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let store = memo::store::open(&cfg.database).await?;
    let state = app_state::AppState::new(cfg, store)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = Arc::new(state.refresher()).spawn(shutdown_rx);

    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "memotrack-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MemoTrackError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MemoTrackError::Internal(format!("server failed: {e}")))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher.await {
        tracing::warn!(error = %e, "refresher task ended abnormally");
    }
    tracing::info!("memotrack-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable; shutting down");
    }
    tracing::info!("shutdown requested");
}
