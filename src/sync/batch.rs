use tokio::time::sleep;
use tracing::{error, info, warn};

use super::sort::PlaylistSorter;
use crate::{error::Result, types::BatchSummary, utils};

const GENERIC_FAILURE: &str = "Operation failed";

impl PlaylistSorter {
    /// Sorts every opted-in playlist of every opted-in principal.
    ///
    /// Playlists are processed one at a time with a short pause in between.
    /// A failing playlist is recorded and the run moves on; a failing principal
    /// does not stop the others. Playlists hit by an integrity-class error get
    /// their auto-sort flag switched off until someone re-enables them.
    ///
    /// Running it again right away is harmless: playlists already in order are
    /// not written.
    pub async fn run_scheduled_sort(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();

        let principals = match self.preferences.auto_sort_principals().await {
            Ok(principals) => principals,
            Err(e) => {
                error!(error = %e, "cannot list principals for scheduled sort");
                summary.errors.push(format!("Global error: {GENERIC_FAILURE}"));
                return summary;
            }
        };
        info!(principals = principals.len(), "scheduled sort started");

        for principal_id in &principals {
            summary.principals_processed += 1;
            if let Err(e) = self.sort_principal(principal_id, &mut summary).await {
                warn!(principal = %principal_id, error = %e, "principal skipped");
                self.record_failure(principal_id, None, &e).await;
                summary.errors.push("User processing failed".to_string());
            }
        }

        info!(
            principals = summary.principals_processed,
            sorted = summary.playlists_sorted,
            skipped = summary.playlists_skipped,
            errors = summary.errors.len(),
            "scheduled sort finished"
        );
        summary
    }

    /// Processes the playlists of one principal. Only errors that concern the
    /// principal as a whole are returned; playlist failures land in `summary`.
    async fn sort_principal(&self, principal_id: &str, summary: &mut BatchSummary) -> Result<()> {
        // fail once for the principal instead of once per playlist
        self.tokens().access_token(principal_id).await?;

        let playlists = self.preferences.playlists(principal_id).await?;
        let (eligible, skipped): (Vec<_>, Vec<_>) =
            playlists.into_iter().partition(|p| p.auto_sort_enabled);
        summary.playlists_skipped += skipped.len();

        let client = self.client_for(principal_id);
        let delay = self.settings().sync.playlist_delay;

        for (index, playlist) in eligible.iter().enumerate() {
            if index > 0 {
                sleep(delay).await;
            }

            match self.sort_with_client(&client, &playlist.playlist_id).await {
                Ok(result) => {
                    summary.playlists_sorted += 1;
                    if let Err(e) = self
                        .record_success(principal_id, &playlist.playlist_id, result.tracks_sorted)
                        .await
                    {
                        warn!(playlist = %playlist.playlist_id, error = %e, "could not record sort");
                    }
                }
                Err(e) => {
                    warn!(
                        principal = principal_id,
                        playlist = %playlist.playlist_id,
                        error = %e,
                        "playlist sort failed"
                    );
                    summary.errors.push(format!(
                        "Playlist {}: {GENERIC_FAILURE}",
                        utils::sanitize_text(&playlist.name)
                    ));
                    self.record_failure(principal_id, Some(&playlist.playlist_id), &e)
                        .await;

                    if e.is_integrity() {
                        self.quarantine(principal_id, &playlist.playlist_id, &playlist.name)
                            .await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn quarantine(&self, principal_id: &str, playlist_id: &str, name: &str) {
        error!(
            principal = principal_id,
            playlist = playlist_id,
            "disabling auto-sort after integrity failure"
        );
        if let Err(e) = self
            .preferences
            .upsert_playlist(principal_id, playlist_id, name, Some(false))
            .await
        {
            warn!(playlist = playlist_id, error = %e, "could not disable auto-sort");
        }
    }
}
