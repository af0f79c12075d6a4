use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::sync::PlaylistSorter;

/// Liveness check. Also tells whether the cron trigger can be used.
pub async fn health(Extension(sorter): Extension<Arc<PlaylistSorter>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "cronEnabled": sorter.settings().cron_secret.is_some(),
    }))
}
