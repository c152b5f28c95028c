//! Linecount server library.
//!
//! Accepts source archives over HTTP, analyzes every matching file in a
//! background job, and exposes the job's progress for polling.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod job;
pub mod routes;
pub mod runner;
pub mod state;
pub mod store;

pub use analyzer::{AnalyzeError, FileAnalyzer, LineCounter};
pub use config::ServerConfig;
pub use error::{ApiError, ErrorResponse};
pub use job::{JobId, JobRecord, JobSnapshot};
pub use runner::{JobHandle, JobRunner};
pub use state::AppState;
pub use store::JobStore;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (upload, progress, health)
/// - Request body limit for uploads
/// - CORS (allows any origin, so a browser client can poll directly)
/// - Request tracing
pub fn create_app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind, serve until Ctrl-C, then drain in-flight requests.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(&config)?);

    let sweeper = config
        .retention
        .map(|retention| state.store.spawn_sweeper(retention, config.sweep_interval));

    let app = create_app(Arc::clone(&state), config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        scratch_root = %state.scratch.root().display(),
        pacing_ms = config.pacing.as_millis() as u64,
        retention_secs = config.retention.map(|r| r.as_secs()),
        "Listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// ============================================================================
// Integration Tests
// ============================================================================
