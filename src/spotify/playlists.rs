use reqwest::Method;
use serde_json::json;
use tracing::debug;

use super::{
    SpotifyClient,
    pagination::{Aggregate, PageCursor},
};
use crate::{
    error::Result,
    types::{Playlist, PlaylistItem, PlaylistSnapshot, SnapshotResponse},
};

const TRACK_FIELDS: &str = "items(added_at,track(id,uri,type,is_local,name,artists(id,name),album(id,name,release_date),disc_number,track_number,duration_ms,popularity)),total,next";

impl SpotifyClient {
    /// Cursor over the principal's playlists (`GET /me/playlists`).
    pub fn playlist_cursor(&self) -> PageCursor<'_, Playlist> {
        PageCursor::new(self, "/me/playlists", self.playlist_page_size)
    }

    /// Every playlist of the principal. Failed pages are skipped.
    pub async fn all_playlists(&self) -> Result<Aggregate<Playlist>> {
        self.playlist_cursor().collect_all().await
    }

    /// Playlist metadata: owner and current track count.
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        self.get(&format!("/playlists/{playlist_id}")).await
    }

    /// Cursor over the raw items of a playlist, null tracks included.
    pub fn track_cursor(&self, playlist_id: &str) -> PageCursor<'_, PlaylistItem> {
        PageCursor::new(
            self,
            // episodes come back typed instead of null, so they are refused, not dropped
            format!(
                "/playlists/{playlist_id}/tracks?fields={TRACK_FIELDS}&additional_types=track,episode"
            ),
            self.track_page_size,
        )
    }

    /// Current tracks of a playlist, in stored order, without null items.
    pub async fn playlist_snapshot(&self, playlist_id: &str) -> Result<PlaylistSnapshot> {
        let aggregate = self.track_cursor(playlist_id).collect_all().await?;
        let fetched = aggregate.items.len();
        let complete = aggregate.is_complete() && fetched >= aggregate.total as usize;

        let tracks: Vec<_> = aggregate
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .collect();

        debug!(
            principal = self.principal_id(),
            playlist = playlist_id,
            fetched,
            valid = tracks.len(),
            total = aggregate.total,
            "playlist snapshot"
        );

        Ok(PlaylistSnapshot {
            playlist_id: playlist_id.to_string(),
            tracks,
            total: aggregate.total,
            complete,
        })
    }

    /// `PUT /playlists/{id}/tracks`: replaces the whole track list.
    ///
    /// An empty `uris` clears the playlist. Only the replacement protocol
    /// should call this.
    pub(crate) async fn set_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        let body = json!({ "uris": uris });
        let _: Option<SnapshotResponse> = self
            .call(
                Method::PUT,
                &format!("/playlists/{playlist_id}/tracks"),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    /// `POST /playlists/{id}/tracks`: appends at the end of the playlist.
    pub(crate) async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        if uris.is_empty() {
            return Ok(());
        }
        let body = json!({ "uris": uris });
        let _: Option<SnapshotResponse> = self
            .call(
                Method::POST,
                &format!("/playlists/{playlist_id}/tracks"),
                Some(&body),
            )
            .await?;
        Ok(())
    }
}
