use tabled::Table;

use crate::{
    error, info, success,
    types::{PlaylistPreference, PlaylistTableRow},
    warning,
};

fn print_playlists(playlists: Vec<PlaylistPreference>) {
    let rows: Vec<PlaylistTableRow> = playlists
        .into_iter()
        .map(|p| PlaylistTableRow {
            id: p.playlist_id,
            name: p.name,
            auto_sort: if p.auto_sort_enabled { "on" } else { "off" }.to_string(),
            last_sorted: p
                .last_sorted_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
}

pub async fn list_playlists(principal_id: String) {
    let sorter = super::sorter();

    match sorter.playlists(&principal_id).await {
        Ok(playlists) if playlists.is_empty() => {
            warning!(
                "No playlists registered. Run `plsort playlists sync {}` first.",
                principal_id
            )
        }
        Ok(mut playlists) => {
            playlists.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            print_playlists(playlists);
        }
        Err(e) => error!("Failed to load playlists. Err: {}", e),
    }
}

pub async fn sync_playlists(principal_id: String) {
    let sorter = super::sorter();

    let pb = super::spinner("Fetching playlists from Spotify...");
    let result = sorter.sync_playlists(&principal_id).await;
    pb.finish_and_clear();

    match result {
        Ok(playlists) => {
            success!("{} playlists registered", playlists.len());
            print_playlists(playlists);
        }
        Err(e) => error!("Cannot sync playlists. Err: {}", e),
    }
}

pub async fn set_playlist_auto_sort(principal_id: String, playlist_id: String, enabled: bool) {
    let sorter = super::sorter();

    match sorter
        .set_playlist_auto_sort(&principal_id, &playlist_id, enabled)
        .await
    {
        Ok(()) if enabled => success!("Auto-sort enabled for playlist {}", playlist_id),
        Ok(()) => info!("Auto-sort disabled for playlist {}", playlist_id),
        Err(e) => error!("Cannot update playlist {}. Err: {}", playlist_id, e),
    }
}
