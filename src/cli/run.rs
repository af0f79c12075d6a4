use crate::{info, success, warning};

pub async fn run() {
    let sorter = super::sorter();

    let pb = super::spinner("Sorting playlists of all opted-in users...");
    let summary = sorter.run_scheduled_sort().await;
    pb.finish_and_clear();

    info!(
        "Processed {} users: {} playlists sorted, {} skipped",
        summary.principals_processed, summary.playlists_sorted, summary.playlists_skipped
    );

    if summary.errors.is_empty() {
        success!("Scheduled sort finished without errors");
        return;
    }

    for message in &summary.errors {
        warning!("{}", message);
    }
    warning!("Scheduled sort finished with {} errors", summary.errors.len());
}
