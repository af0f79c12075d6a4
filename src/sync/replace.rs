use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::{
    error::{Result, SyncError},
    spotify::SpotifyClient,
};

/// Writes `uris` as the complete content of a playlist and verifies the result.
///
/// Up to one chunk of tracks is written with a single set call. Larger lists
/// clear the playlist first and then append chunk by chunk, pausing between
/// chunks. Either way the playlist is re-read afterwards and its track count
/// must equal `expected`.
///
/// Returns the verified track count.
///
/// # Errors
///
/// - [`SyncError::InvalidReplacement`] when `uris` is empty or its length
///   differs from `expected`; nothing is sent in that case
/// - [`SyncError::PartialWrite`] when the clear step or an append fails; the
///   playlist may already be empty at that point
/// - [`SyncError::Integrity`] when the verification count differs or cannot
///   be fetched
/// - any error of the first write call, unchanged
pub async fn replace_tracks(
    client: &SpotifyClient,
    playlist_id: &str,
    uris: &[String],
    expected: usize,
) -> Result<usize> {
    if uris.is_empty() {
        return Err(SyncError::InvalidReplacement(
            "refusing to write an empty track list".to_string(),
        ));
    }
    if uris.len() != expected {
        return Err(SyncError::InvalidReplacement(format!(
            "track count mismatch before write: expected {expected}, got {}",
            uris.len()
        )));
    }

    let chunk_size = client.write_chunk_size;
    if uris.len() <= chunk_size {
        client.set_tracks(playlist_id, uris).await?;
    } else {
        write_in_chunks(client, playlist_id, uris, chunk_size).await?;
    }

    verify(client, playlist_id, expected).await
}

async fn write_in_chunks(
    client: &SpotifyClient,
    playlist_id: &str,
    uris: &[String],
    chunk_size: usize,
) -> Result<()> {
    let expected = uris.len();
    debug!(playlist = playlist_id, tracks = expected, "clearing playlist before chunked write");
    // a clear that timed out or failed upstream may still have been applied
    if let Err(e) = client.set_tracks(playlist_id, &[]).await {
        error!(
            playlist = playlist_id,
            expected,
            error = %e,
            "clear step failed, playlist state unknown"
        );
        return Err(SyncError::PartialWrite {
            expected,
            written: 0,
        });
    }

    let mut written = 0;
    for (index, chunk) in uris.chunks(chunk_size).enumerate() {
        if index > 0 {
            sleep(client.chunk_delay).await;
        }
        if let Err(e) = client.add_tracks(playlist_id, chunk).await {
            error!(
                playlist = playlist_id,
                written,
                expected,
                error = %e,
                "chunked write interrupted, playlist is incomplete"
            );
            return Err(SyncError::PartialWrite { expected, written });
        }
        written += chunk.len();
        debug!(playlist = playlist_id, written, expected, "chunk appended");
    }
    Ok(())
}

async fn verify(client: &SpotifyClient, playlist_id: &str, expected: usize) -> Result<usize> {
    let actual = match client.get_playlist(playlist_id).await {
        Ok(playlist) => playlist.tracks.total as usize,
        Err(e) => {
            error!(playlist = playlist_id, error = %e, "could not verify written playlist");
            return Err(SyncError::Integrity {
                expected,
                actual: None,
            });
        }
    };

    if actual != expected {
        error!(playlist = playlist_id, expected, actual, "track count mismatch after write");
        return Err(SyncError::Integrity {
            expected,
            actual: Some(actual),
        });
    }

    info!(playlist = playlist_id, tracks = actual, "playlist rewritten and verified");
    Ok(actual)
}
