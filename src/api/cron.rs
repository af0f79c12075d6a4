use std::{sync::Arc, time::Instant};

use axum::{Extension, http::HeaderMap, response::Json};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use super::{ApiError, authorize};
use crate::sync::PlaylistSorter;

/// Runs the scheduled sort and reports its summary.
pub async fn cron_sort(
    headers: HeaderMap,
    Extension(sorter): Extension<Arc<PlaylistSorter>>,
) -> Result<Json<Value>, ApiError> {
    authorize(&headers, sorter.settings().cron_secret.as_deref())?;

    let started = Instant::now();
    let summary = sorter.run_scheduled_sort().await;
    let duration = started.elapsed().as_millis();
    info!(duration_ms = duration as u64, "scheduled sort triggered over http");

    Ok(Json(json!({
        "success": true,
        "message": "Playlist sorting completed",
        "timestamp": Utc::now().to_rfc3339(),
        "duration": format!("{duration}ms"),
        "results": {
            "principalsProcessed": summary.principals_processed,
            "playlistsSorted": summary.playlists_sorted,
            "playlistsSkipped": summary.playlists_skipped,
            "errorCount": summary.errors.len(),
            "errors": summary.errors,
        }
    })))
}
