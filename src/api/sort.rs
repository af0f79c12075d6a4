use std::sync::Arc;

use axum::{Extension, extract::Path, http::HeaderMap, response::Json};
use serde_json::{Value, json};
use tracing::warn;

use super::{ApiError, RequestLimiter, authorize, client_identifier};
use crate::sync::PlaylistSorter;

/// Sorts one playlist on behalf of a principal.
///
/// The client budget is charged before the secret is checked, so guessing
/// the secret is limited too. Callers without proxy headers share the budget
/// of the principal they act for.
pub async fn sort_playlist(
    headers: HeaderMap,
    Path((principal_id, playlist_id)): Path<(String, String)>,
    Extension(sorter): Extension<Arc<PlaylistSorter>>,
    Extension(limiter): Extension<Arc<RequestLimiter>>,
) -> Result<Json<Value>, ApiError> {
    let client = client_identifier(&headers).unwrap_or_else(|| principal_id.clone());
    if let Err(wait) = limiter.check(&format!("sort:{client}")) {
        warn!(client = %client, "sort endpoint rate limited");
        return Err(ApiError::TooManyRequests(wait));
    }

    authorize(&headers, sorter.settings().cron_secret.as_deref())?;

    let result = sorter.sort_playlist(&principal_id, &playlist_id).await?;

    Ok(Json(json!({
        "success": true,
        "tracksSorted": result.tracks_sorted,
        "written": result.written,
    })))
}
