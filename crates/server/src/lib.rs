//! Reelcap Server
//!
//! HTTP surface over the staging and finalize pipeline:
//!
//! - `POST /api/sessions/{id}/batches` — stage one frame batch
//! - `POST /api/sessions/{id}/finalize` — encode and return the MP4
//! - `POST /api/videos` — publish an encoded artifact
//! - `GET  /healthz`
//!
//! A per-session mutex in the [`registry`] serializes batch staging and
//! finalize for one session; distinct sessions proceed concurrently since
//! the store is naturally partitioned by session id.

pub mod registry;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use reelcap_common::error::ReelcapResult;
use reelcap_session_store::SessionStore;

pub use registry::SessionRegistry;
pub use state::AppState;

/// Assemble the API router.
pub fn build_router(state: AppState, max_batch_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route(
            "/api/sessions/{session_id}/batches",
            post(routes::stage_batch),
        )
        .route(
            "/api/sessions/{session_id}/finalize",
            post(routes::finalize_session),
        )
        .route("/api/videos", post(routes::publish_video))
        // Raw frame batches dwarf axum's default body limit.
        .layer(DefaultBodyLimit::max(max_batch_bytes))
        .with_state(state)
}

/// Serve the router until ctrl-c.
pub async fn serve(addr: &str, router: Router) -> ReelcapResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Periodically sweep abandoned staging partitions.
///
/// A client that stops sending batches leaves an orphaned partition behind;
/// without this task it would hold disk forever.
pub fn spawn_reaper(store: Arc<SessionStore>, ttl: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = (ttl / 2).max(Duration::from_secs(30));
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let sweep_store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || sweep_store.reap_stale(ttl)).await {
                Ok(Ok(reaped)) => {
                    if !reaped.is_empty() {
                        tracing::info!(count = reaped.len(), "Reaper removed stale sessions");
                    }
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "Reaper sweep failed"),
                Err(e) => tracing::warn!(error = %e, "Reaper task panicked"),
            }
        }
    })
}
