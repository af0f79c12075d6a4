use crate::{error, info, success, warning};

pub async fn sort(principal_id: String, playlist_id: String) {
    let sorter = super::sorter();

    let pb = super::spinner(format!("Sorting playlist {}...", playlist_id));
    let result = sorter.sort_playlist(&principal_id, &playlist_id).await;
    pb.finish_and_clear();

    match result {
        Ok(result) if result.written => {
            success!("Sorted {} tracks in playlist {}", result.tracks_sorted, playlist_id)
        }
        Ok(result) if result.tracks_sorted == 0 => {
            info!("Playlist {} has no tracks to sort", playlist_id)
        }
        Ok(result) => success!(
            "Playlist {} is already in order ({} tracks)",
            playlist_id,
            result.tracks_sorted
        ),
        Err(e) if e.is_auth() => error!(
            "{} Run `plsort principals add {}` with a fresh refresh token.",
            e.public_message(),
            principal_id
        ),
        Err(e) if e.is_integrity() => {
            warning!("{}", e);
            error!("{}", e.public_message())
        }
        Err(e) => error!("Cannot sort playlist {}. Err: {}", playlist_id, e),
    }
}
