use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use tracing::{info, warn};

use super::replace::replace_tracks;
use crate::{
    config::Settings,
    error::{Result, SyncError},
    management::{AuditStore, CredentialStore, PreferenceStore, TokenManager},
    ordering,
    spotify::{SpotifyClient, auth::TokenEndpoint},
    types::{PlaylistPreference, SortOutcome, SortResult, SortStatus, Track},
    utils,
};

/// Sorts playlists on behalf of principals and records every attempt.
///
/// One instance owns the token manager (and with it the refresh locks), so it
/// should live as long as the process and be shared behind an [`Arc`].
pub struct PlaylistSorter {
    http: Client,
    settings: Settings,
    tokens: Arc<TokenManager>,
    pub(crate) preferences: Arc<dyn PreferenceStore>,
    pub(crate) audit: Arc<dyn AuditStore>,
}

impl PlaylistSorter {
    pub fn new(
        http: Client,
        settings: Settings,
        credentials: Arc<dyn CredentialStore>,
        preferences: Arc<dyn PreferenceStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        let endpoint = TokenEndpoint::new(http.clone(), &settings);
        let tokens = Arc::new(TokenManager::new(credentials, endpoint, &settings.sync));
        Self {
            http,
            settings,
            tokens,
            preferences,
            audit,
        }
    }

    /// Builds a sorter whose three stores are the same object.
    pub fn with_store<S>(http: Client, settings: Settings, store: Arc<S>) -> Self
    where
        S: CredentialStore + PreferenceStore + AuditStore + 'static,
    {
        Self::new(http, settings, store.clone(), store.clone(), store)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// API client acting for `principal_id`.
    pub fn client_for(&self, principal_id: &str) -> SpotifyClient {
        SpotifyClient::new(
            self.http.clone(),
            &self.settings,
            Arc::clone(&self.tokens),
            principal_id,
        )
    }

    /// Sorts one playlist the principal owns and records the outcome.
    ///
    /// Errors are returned unchanged so callers can tell an expired session
    /// from a rate limit or an integrity failure.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidInput`] for a malformed playlist id (not recorded)
    /// - [`SyncError::Forbidden`] when the principal does not own the playlist
    /// - any error of [`PlaylistSorter::sort_with_client`]
    pub async fn sort_playlist(&self, principal_id: &str, playlist_id: &str) -> Result<SortResult> {
        let playlist_id = utils::validate_playlist_id(playlist_id)?;
        let client = self.client_for(principal_id);

        let result = async {
            let playlist = client.get_playlist(playlist_id).await?;
            if playlist.owner.id != principal_id {
                return Err(SyncError::Forbidden(playlist_id.to_string()));
            }
            self.sort_with_client(&client, playlist_id).await
        }
        .await;

        match &result {
            Ok(sorted) => {
                self.record_success(principal_id, playlist_id, sorted.tracks_sorted)
                    .await?;
            }
            Err(e) => {
                warn!(principal = principal_id, playlist = playlist_id, error = %e, "sort failed");
                self.record_failure(principal_id, Some(playlist_id), e).await;
            }
        }
        result
    }

    /// Reads, orders and, when needed, rewrites one playlist.
    ///
    /// Null items are dropped from the snapshot and never written back. An
    /// empty playlist or one already in canonical order is left untouched.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidReplacement`] when the snapshot could not be read
    /// completely, or contains local files or podcast episodes: rewriting from
    /// such a snapshot would drop or corrupt items.
    pub async fn sort_with_client(
        &self,
        client: &SpotifyClient,
        playlist_id: &str,
    ) -> Result<SortResult> {
        let snapshot = client.playlist_snapshot(playlist_id).await?;
        if !snapshot.complete {
            return Err(SyncError::InvalidReplacement(format!(
                "playlist {playlist_id} could not be read completely"
            )));
        }

        if snapshot.tracks.is_empty() {
            info!(playlist = playlist_id, "playlist is empty, nothing to sort");
            return Ok(SortResult {
                tracks_sorted: 0,
                written: false,
            });
        }

        if let Some(item) = snapshot.tracks.iter().find(|t| !t.is_writable_track()) {
            let kind = if item.is_local || item.id.is_none() {
                "local tracks"
            } else {
                "non-track items"
            };
            return Err(SyncError::InvalidReplacement(format!(
                "playlist {playlist_id} contains {kind}"
            )));
        }

        let decision = ordering::decide(&snapshot.tracks);
        if !decision.needs_write {
            info!(
                playlist = playlist_id,
                tracks = snapshot.tracks.len(),
                "already in order, skipping write"
            );
            return Ok(SortResult {
                tracks_sorted: snapshot.tracks.len(),
                written: false,
            });
        }

        let uris: Vec<String> = decision.target.iter().filter_map(Track::uri).collect();
        info!(playlist = playlist_id, tracks = uris.len(), "rewriting playlist");
        let tracks_sorted = replace_tracks(client, playlist_id, &uris, decision.target.len()).await?;

        Ok(SortResult {
            tracks_sorted,
            written: true,
        })
    }

    /// Registers every playlist the principal owns in the preference store.
    ///
    /// New playlists are opted in, known ones keep their flag and get their
    /// name refreshed. Playlists owned by other users are not registered
    /// since they cannot be rewritten.
    pub async fn sync_playlists(&self, principal_id: &str) -> Result<Vec<PlaylistPreference>> {
        let client = self.client_for(principal_id);
        let playlists = client.all_playlists().await?;
        if !playlists.is_complete() {
            warn!(
                principal = principal_id,
                failed_pages = playlists.failed_pages,
                "some playlist pages failed, registering what was fetched"
            );
        }

        let mut registered = 0;
        for playlist in playlists.items.iter().filter(|p| p.owner.id == principal_id) {
            let name = utils::sanitize_text(&playlist.name);
            self.preferences
                .upsert_playlist(principal_id, &playlist.id, &name, None)
                .await?;
            registered += 1;
        }
        info!(
            principal = principal_id,
            registered,
            listed = playlists.items.len(),
            "playlists synchronized"
        );

        self.preferences.playlists(principal_id).await
    }

    /// Turns auto-sort on or off for a registered playlist.
    pub async fn set_playlist_auto_sort(
        &self,
        principal_id: &str,
        playlist_id: &str,
        enabled: bool,
    ) -> Result<()> {
        let playlist_id = utils::validate_playlist_id(playlist_id)?;
        let playlists = self.preferences.playlists(principal_id).await?;
        let Some(existing) = playlists.iter().find(|p| p.playlist_id == playlist_id) else {
            return Err(SyncError::InvalidInput(format!(
                "playlist {playlist_id} is not registered"
            )));
        };
        self.preferences
            .upsert_playlist(principal_id, playlist_id, &existing.name, Some(enabled))
            .await
    }

    pub async fn set_principal_auto_sort(&self, principal_id: &str, enabled: bool) -> Result<()> {
        self.preferences
            .set_principal_auto_sort(principal_id, enabled)
            .await
    }

    pub async fn playlists(&self, principal_id: &str) -> Result<Vec<PlaylistPreference>> {
        self.preferences.playlists(principal_id).await
    }

    /// Latest recorded outcomes of a principal, newest first.
    pub async fn history(&self, principal_id: &str, limit: usize) -> Result<Vec<SortOutcome>> {
        self.audit.outcomes(principal_id, limit).await
    }

    pub(crate) async fn record_success(
        &self,
        principal_id: &str,
        playlist_id: &str,
        tracks_sorted: usize,
    ) -> Result<()> {
        let now = Utc::now();
        self.preferences
            .mark_sorted(principal_id, playlist_id, now)
            .await?;
        self.audit
            .append(SortOutcome {
                principal_id: principal_id.to_string(),
                playlist_id: Some(playlist_id.to_string()),
                status: SortStatus::Success,
                tracks_sorted,
                error_message: None,
                sorted_at: now,
            })
            .await
    }

    /// Appends a failed outcome. A store failure here is logged, never raised,
    /// so it cannot mask the error being recorded.
    pub(crate) async fn record_failure(
        &self,
        principal_id: &str,
        playlist_id: Option<&str>,
        error: &SyncError,
    ) {
        let outcome = SortOutcome {
            principal_id: principal_id.to_string(),
            playlist_id: playlist_id.map(str::to_string),
            status: error.outcome_status(),
            tracks_sorted: 0,
            error_message: Some(error.public_message().to_string()),
            sorted_at: Utc::now(),
        };
        if let Err(e) = self.audit.append(outcome).await {
            warn!(principal = principal_id, error = %e, "could not record failed sort");
        }
    }
}
