use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub principal_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// True once `now` is within `margin` of the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>, margin: std::time::Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
        now >= self.expires_at - margin
    }
}

/// Answer of the token endpoint for a refresh grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent when the previous refresh token stays valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, depending on the precision Spotify has.
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// `None` for local files, which cannot be written back.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub disc_number: u32,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub uri: Option<String>,
    /// `track` or `episode`. Older payloads omit it.
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

impl Track {
    /// True for items that can be written back as `spotify:track:` uris.
    pub fn is_writable_track(&self) -> bool {
        !self.is_local
            && self.id.is_some()
            && self.item_type.as_deref().is_none_or(|t| t == "track")
    }

    /// The item's own uri, falling back to the track uri built from the id.
    pub fn uri(&self) -> Option<String> {
        self.uri
            .clone()
            .or_else(|| self.id.as_ref().map(|id| format!("spotify:track:{id}")))
    }
}

/// One entry of a playlist. `track` is null for removed or unavailable songs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub added_at: Option<String>,
    pub track: Option<Track>,
}

/// One page of a paginated collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: PlaylistOwner,
    pub tracks: PlaylistTracksRef,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default)]
    pub id: Option<String>,
    pub danceability: f64,
    pub energy: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: u64,
    pub time_signature: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// Tracks of a playlist as currently stored on Spotify, null items removed.
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    pub playlist_id: String,
    pub tracks: Vec<Track>,
    /// Total reported by Spotify, null items included.
    pub total: u32,
    /// False when a page failed to load and `tracks` may be an undercount.
    pub complete: bool,
}

/// Target order computed from a snapshot.
#[derive(Debug, Clone)]
pub struct SortDecision {
    pub target: Vec<Track>,
    /// False when the snapshot already is in target order.
    pub needs_write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortStatus {
    Success,
    Failed,
    Partial,
}

impl std::fmt::Display for SortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortStatus::Success => "success",
            SortStatus::Failed => "failed",
            SortStatus::Partial => "partial",
        };
        f.write_str(s)
    }
}

/// Append-only audit record of one sort attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOutcome {
    pub principal_id: String,
    /// `None` when the attempt failed before any playlist was touched.
    pub playlist_id: Option<String>,
    pub status: SortStatus,
    pub tracks_sorted: usize,
    pub error_message: Option<String>,
    pub sorted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistPreference {
    pub playlist_id: String,
    pub name: String,
    pub auto_sort_enabled: bool,
    #[serde(default)]
    pub last_sorted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalPreference {
    pub principal_id: String,
    pub auto_sort_enabled: bool,
    #[serde(default)]
    pub playlists: Vec<PlaylistPreference>,
}

/// Result of a single playlist sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortResult {
    pub tracks_sorted: usize,
    /// False when the idempotence check skipped the write.
    pub written: bool,
}

/// Aggregate of one scheduled run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub principals_processed: usize,
    pub playlists_sorted: usize,
    pub playlists_skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub auto_sort: String,
    pub last_sorted: String,
}

#[derive(Tabled)]
pub struct SortOutcomeTableRow {
    pub sorted_at: String,
    pub playlist: String,
    pub status: String,
    pub tracks: usize,
    pub message: String,
}

#[derive(Tabled)]
pub struct AudioFeaturesTableRow {
    pub track: String,
    pub tempo: String,
    pub energy: String,
    pub danceability: String,
    pub valence: String,
}
