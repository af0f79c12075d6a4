//! # CLI Module
//!
//! User-facing commands of plsort. Every command loads the settings from the
//! environment, opens the JSON stores in the data directory and delegates to
//! [`PlaylistSorter`]. Output goes through the colored status macros, tables
//! through `tabled`, and long-running calls show a spinner.
//!
//! ## Commands
//!
//! - [`sort`] - sort one playlist now
//! - [`run`] - run the scheduled sort over every opted-in principal
//! - [`serve`] - start the HTTP service (health, cron trigger, sort endpoint)
//! - [`list_playlists`], [`sync_playlists`], [`set_playlist_auto_sort`] -
//!   registered playlists and their auto-sort flag
//! - [`add_principal`], [`set_principal_auto_sort`] - principals and their flag
//! - [`logs`] - recent sort outcomes of a principal
//! - [`features`] - audio features of a playlist's tracks
//!
//! ## Usage
//!
//! ```bash
//! plsort principals add alice --refresh-token AQD...
//! plsort playlists sync alice
//! plsort sort alice 37i9dQZF1DXcBWIGoYBM5M
//! plsort run
//! ```
//!
//! Fatal problems (missing configuration, unreadable stores) end the process
//! through `error!`.

mod features;
mod logs;
mod playlists;
mod principals;
mod run;
mod serve;
mod sort;

pub use features::features;
pub use logs::logs;
pub use playlists::list_playlists;
pub use playlists::set_playlist_auto_sort;
pub use playlists::sync_playlists;
pub use principals::add_principal;
pub use principals::set_principal_auto_sort;
pub use run::run;
pub use serve::serve;
pub use sort::sort;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use crate::{config::Settings, error, management::FileStore, sync::PlaylistSorter};

/// Sorter backed by the file stores of the configured data directory.
pub(crate) fn sorter() -> PlaylistSorter {
    sorter_with_store().0
}

/// Like [`sorter`], also handing out the store for direct credential writes.
pub(crate) fn sorter_with_store() -> (PlaylistSorter, Arc<FileStore>) {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Cannot load settings. Err: {}", e),
    };
    let cipher = match settings.token_cipher() {
        Ok(cipher) => cipher,
        Err(e) => error!("Cannot open the credential store. Err: {}", e),
    };
    let store = Arc::new(FileStore::new(settings.data_dir.clone(), cipher));
    let sorter = PlaylistSorter::with_store(Client::new(), settings, store.clone());
    (sorter, store)
}

pub(crate) fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
