//! HTTP server for Tidecast
//!
//! Exposes the orchestrator's operations as a JSON + streaming API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tidecast_core::TorrentService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    add_magnet, list_torrents, play, remove_torrent, select_file, stream_file, torrent_stats,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TorrentService>,
}

/// Builds the router with every API route and the CORS and tracing layers.
pub fn router(service: Arc<TorrentService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/api/addmagnet", post(add_magnet))
        .route("/api/selectfile", post(select_file))
        .route("/api/stream", get(stream_file))
        .route("/api/removetorrent", post(remove_torrent))
        .route("/api/torrents", get(list_torrents))
        .route("/api/torrent", get(torrent_stats))
        .route("/api/play", get(play))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `addr` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish; the caller is responsible for
/// tearing down sessions afterwards.
///
/// # Errors
/// - `std::io::Error` - Failed to bind or serve
pub async fn run_server<F>(
    addr: SocketAddr,
    service: Arc<TorrentService>,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Tidecast listening on http://{}", local_addr);

    let cancel = service.shutdown_token();
    let app = router(service);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            // Unblock requests parked on metadata so draining can finish
            cancel.cancel();
            tracing::info!("Shutdown requested, draining connections");
        })
        .await
}
