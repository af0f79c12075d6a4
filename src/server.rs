use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tracing::info;

use crate::{
    api,
    error::{Result, SyncError},
    sync::PlaylistSorter,
};

/// Interactive sort requests allowed per client and minute.
pub const SORT_REQUESTS_PER_MINUTE: u32 = 10;

/// Routes of the service, sharing one sorter and the sort endpoint limiter.
pub fn router(sorter: Arc<PlaylistSorter>) -> Router {
    let limiter = Arc::new(api::RequestLimiter::per_minute(SORT_REQUESTS_PER_MINUTE));
    Router::new()
        .route("/health", get(api::health))
        .route("/cron/sort-playlists", get(api::cron_sort))
        .route(
            "/principals/{principal_id}/playlists/{playlist_id}/sort",
            post(api::sort_playlist),
        )
        .layer(Extension(sorter))
        .layer(Extension(limiter))
}

/// Serves the API on `SERVER_ADDRESS` until the process is stopped.
pub async fn start_api_server(sorter: Arc<PlaylistSorter>) -> Result<()> {
    let address = sorter.settings().server_address.clone();
    let addr = SocketAddr::from_str(&address)
        .map_err(|e| SyncError::Config(format!("invalid server address {address}: {e}")))?;

    let app = router(sorter);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SyncError::Network(format!("cannot bind {addr}: {e}")))?;
    info!(%addr, "api server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| SyncError::Network(e.to_string()))
}
