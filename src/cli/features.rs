use std::collections::{HashMap, HashSet};

use tabled::Table;

use crate::{error, types::AudioFeaturesTableRow, utils, warning};

pub async fn features(principal_id: String, playlist_id: String) {
    let playlist_id = match utils::validate_playlist_id(&playlist_id) {
        Ok(id) => id.to_string(),
        Err(e) => error!("{}", e),
    };

    let sorter = super::sorter();
    let client = sorter.client_for(&principal_id);

    let pb = super::spinner("Fetching tracks and audio features...");
    let snapshot = match client.playlist_snapshot(&playlist_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to load playlist tracks. Err: {}", e);
        }
    };
    if !snapshot.complete {
        warning!("Some pages failed to load, the list is incomplete");
    }

    let names: HashMap<String, String> = snapshot
        .tracks
        .iter()
        .filter_map(|t| t.id.clone().map(|id| (id, t.name.clone())))
        .collect();
    let mut seen = HashSet::new();
    let ids: Vec<String> = snapshot
        .tracks
        .iter()
        .filter_map(|t| t.id.clone())
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let features = match client.audio_features(&ids).await {
        Ok(features) => features,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to load audio features. Err: {}", e);
        }
    };
    pb.finish_and_clear();

    let rows: Vec<AudioFeaturesTableRow> = features
        .into_iter()
        .map(|f| AudioFeaturesTableRow {
            track: f
                .id
                .as_ref()
                .and_then(|id| names.get(id))
                .cloned()
                .unwrap_or_default(),
            tempo: format!("{:.0}", f.tempo),
            energy: format!("{:.2}", f.energy),
            danceability: format!("{:.2}", f.danceability),
            valence: format!("{:.2}", f.valence),
        })
        .collect();

    println!("{}", Table::new(rows));
}
