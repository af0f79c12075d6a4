//! # API Module
//!
//! HTTP endpoints of the plsort service, built on [Axum](https://docs.rs/axum).
//!
//! ## Endpoints
//!
//! - [`health`] - status and version, no authentication
//! - [`cron_sort`] - `GET /cron/sort-playlists`, runs the scheduled sort and
//!   returns the run summary
//! - [`sort_playlist`] - `POST /principals/{principal}/playlists/{playlist}/sort`,
//!   sorts one playlist on behalf of a principal
//!
//! Everything except `/health` requires `Authorization: Bearer <CRON_SECRET>`.
//! Without a configured secret those endpoints answer `500` and never run.
//! The sort endpoint is additionally limited per client by a
//! [`RequestLimiter`] and answers `429` with `Retry-After` once the budget is
//! spent.
//!
//! Error bodies carry only the generic message of the error kind.

mod cron;
mod health;
mod rate_limit;
mod sort;

pub use cron::cron_sort;
pub use health::health;
pub use rate_limit::{RequestLimiter, client_identifier};
pub use sort::sort_playlist;

use std::time::Duration;

use axum::{
    Json,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, RETRY_AFTER},
    },
    response::{IntoResponse, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::SyncError;

/// Error answer of an endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// No secret configured, protected endpoints are disabled.
    SecretMissing,
    Unauthorized,
    /// Client budget spent; retry after the given wait.
    TooManyRequests(Duration),
    Sync(SyncError),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError::Sync(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::SecretMissing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CRON_SECRET environment variable is required",
            ),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::TooManyRequests(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please try again later.",
            ),
            ApiError::Sync(err) => (status_for(err), err.public_message()),
        };
        let mut response =
            (status, Json(json!({ "success": false, "error": message }))).into_response();

        if let ApiError::TooManyRequests(wait) = self {
            // whole seconds, rounded up, never zero
            let secs = (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// HTTP status reported for a sync error.
pub fn status_for(err: &SyncError) -> StatusCode {
    match err {
        SyncError::Auth(_) => StatusCode::UNAUTHORIZED,
        SyncError::Forbidden(_) => StatusCode::FORBIDDEN,
        SyncError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SyncError::RateLimitExhausted => StatusCode::TOO_MANY_REQUESTS,
        SyncError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SyncError::Upstream { .. } | SyncError::Network(_) | SyncError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Checks `Authorization: Bearer <secret>` against the configured secret.
pub(crate) fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        return Err(ApiError::SecretMissing);
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if bool::from(token.as_bytes().ct_eq(secret.as_bytes())) => Ok(()),
        _ => {
            warn!("rejected request with missing or wrong bearer secret");
            Err(ApiError::Unauthorized)
        }
    }
}
