use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    types::{Credential, PlaylistPreference, SortOutcome},
};

/// Persistence of credentials, one per principal.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, principal_id: &str) -> Result<Credential>;
    async fn put(&self, principal_id: &str, credential: Credential) -> Result<()>;
}

/// Principal- and playlist-level auto-sort preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Principals whose own auto-sort flag is enabled.
    async fn auto_sort_principals(&self) -> Result<Vec<String>>;

    async fn set_principal_auto_sort(&self, principal_id: &str, enabled: bool) -> Result<()>;

    /// All registered playlists of a principal, opted in or not.
    async fn playlists(&self, principal_id: &str) -> Result<Vec<PlaylistPreference>>;

    /// Inserts or renames a playlist. `auto_sort` of `None` keeps the stored
    /// flag, or enables it for a new playlist.
    async fn upsert_playlist(
        &self,
        principal_id: &str,
        playlist_id: &str,
        name: &str,
        auto_sort: Option<bool>,
    ) -> Result<()>;

    async fn mark_sorted(
        &self,
        principal_id: &str,
        playlist_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Append-only log of sort attempts.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, outcome: SortOutcome) -> Result<()>;

    /// Most recent outcomes of a principal, newest first.
    async fn outcomes(&self, principal_id: &str, limit: usize) -> Result<Vec<SortOutcome>>;
}
