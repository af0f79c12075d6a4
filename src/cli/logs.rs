use tabled::Table;

use crate::{error, types::SortOutcomeTableRow, warning};

pub async fn logs(principal_id: String, limit: usize) {
    let sorter = super::sorter();

    let outcomes = match sorter.history(&principal_id, limit).await {
        Ok(outcomes) => outcomes,
        Err(e) => error!("Failed to load sort history. Err: {}", e),
    };

    if outcomes.is_empty() {
        warning!("No sorts recorded for {}", principal_id);
        return;
    }

    let rows: Vec<SortOutcomeTableRow> = outcomes
        .into_iter()
        .map(|o| SortOutcomeTableRow {
            sorted_at: o.sorted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            playlist: o.playlist_id.unwrap_or_else(|| "-".to_string()),
            status: o.status.to_string(),
            tracks: o.tracks_sorted,
            message: o.error_message.unwrap_or_default(),
        })
        .collect();

    println!("{}", Table::new(rows));
}
