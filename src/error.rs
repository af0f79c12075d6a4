//! Error taxonomy for the synchronization core.
//!
//! Every failure that can happen while talking to Spotify or rewriting a
//! playlist ends up as a [`SyncError`]. The `Display` output of each variant is
//! safe to log: it never carries token values or raw upstream bodies. For text
//! that leaves the process (batch summaries, audit records, HTTP responses) use
//! [`SyncError::public_message`], which is generic per error kind.

use thiserror::Error;

use crate::types::SortStatus;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by the token manager, the API client and the sort pipeline.
///
/// The type is `Clone` because a single refresh result is handed to every
/// caller waiting on the same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Credential invalid, revoked or unrefreshable. Requires re-authentication.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Still rate limited after the single backoff-and-retry.
    #[error("rate limit exhausted after retry")]
    RateLimitExhausted,

    /// The call did not complete within its budget.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Post-write verification did not find the expected track count.
    /// `actual` is `None` when the verification fetch itself failed.
    #[error("track count mismatch after write: expected {expected}, found {}", display_count(.actual))]
    Integrity {
        expected: usize,
        actual: Option<usize>,
    },

    /// A chunked write failed after the playlist had been cleared.
    #[error("write interrupted after {written} of {expected} tracks")]
    PartialWrite { expected: usize, written: usize },

    /// Any other non-2xx answer from Spotify.
    #[error("Spotify API error: {status}")]
    Upstream { status: u16 },

    /// A replacement was refused before touching the network.
    #[error("replacement refused: {0}")]
    InvalidReplacement(String),

    /// The principal does not own the playlist.
    #[error("playlist {0} is not owned by the requesting user")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

fn display_count(count: &Option<usize>) -> String {
    count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl SyncError {
    /// Generic message for the error kind, safe to show to end users.
    pub fn public_message(&self) -> &'static str {
        match self {
            SyncError::Auth(_) => "Spotify session expired. Please re-authenticate.",
            SyncError::RateLimitExhausted => "Spotify rate limit reached. Please try again later.",
            SyncError::Timeout(_) => "Spotify did not respond in time.",
            SyncError::Integrity { .. } | SyncError::PartialWrite { .. } => {
                "Playlist verification failed. Sorting has been halted for this playlist."
            }
            SyncError::Forbidden(_) => "You do not have permission to sort this playlist.",
            SyncError::InvalidInput(_) => "Invalid request.",
            _ => "Operation failed",
        }
    }

    /// True for errors that indicate tracks may have been lost.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            SyncError::Integrity { .. } | SyncError::PartialWrite { .. }
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }

    /// Audit status recorded for a failed attempt.
    pub fn outcome_status(&self) -> SortStatus {
        match self {
            SyncError::PartialWrite { .. } => SortStatus::Partial,
            _ => SortStatus::Failed,
        }
    }
}

/// Timeouts are not mapped here: only the caller knows the budget that ran
/// out, so call sites check `is_timeout` before converting.
impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return SyncError::Upstream {
                status: status.as_u16(),
            };
        }
        // strip the url, it may carry query parameters
        SyncError::Network(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Store(err.to_string())
    }
}
