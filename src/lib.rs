//! Playlist sorting engine for Spotify
//!
//! plsort keeps Spotify playlists ordered by release date, newest first, with
//! the tracks of one album kept together. It refreshes user tokens on demand,
//! survives rate limits and expired sessions with a single retry, and rewrites
//! playlists through a guarded protocol that verifies the track count after
//! every write.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints (health, cron trigger, sort)
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy and sanitized messages
//! - `management` - Token lifecycle and persistence stores
//! - `ordering` - Canonical track order
//! - `server` - Axum server wiring
//! - `spotify` - Spotify Web API client implementation
//! - `sync` - Safe playlist replacement, single sort and scheduled batch
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use plsort::{config::Settings, management::FileStore, sync::PlaylistSorter};
//!
//! #[tokio::main]
//! async fn main() -> plsort::Res<()> {
//!     plsort::config::load_env().await?;
//!     let settings = Settings::from_env()?;
//!     let store = Arc::new(FileStore::new(settings.data_dir.clone(), settings.token_cipher()?));
//!     let sorter = PlaylistSorter::with_store(reqwest::Client::new(), settings, store);
//!     let summary = sorter.run_scheduled_sort().await;
//!     println!("{} playlists sorted", summary.playlists_sorted);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod ordering;
pub mod server;
pub mod spotify;
pub mod sync;
pub mod types;
pub mod utils;

/// Boxed error alias for glue code that mixes crate errors with others.
///
/// Library code returns [`error::Result`].
///
/// ```
/// use plsort::Res;
///
/// async fn summary_json() -> Res<String> {
///     Ok(serde_json::to_string(&plsort::types::BatchSummary::default())?)
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

// Terminal status lines of the CLI. Structured logs go through `tracing`.

#[doc(hidden)]
#[macro_export]
macro_rules! __status_line {
  ($print:ident, $marker:expr, $color:ident, $($arg:tt)*) => ({
    use colored::Colorize;
    $print!("[{}] {}", $marker.$color().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a progress line with a blue `[o]` marker on stdout.
///
/// Used by the CLI for neutral status, such as which principal or playlist
/// is being worked on.
///
/// # Arguments
///
/// Same as `println!`: a format string followed by its values.
///
/// # Example
///
/// ```
/// use plsort::info;
///
/// let principal = "alice";
/// info!("Syncing playlists of {principal}");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ($crate::__status_line!(println, "o", blue, $($arg)*))
}

/// Prints a green `[✓]` line on stdout once an operation has completed.
///
/// # Arguments
///
/// Same as `println!`.
///
/// # Example
///
/// ```
/// use plsort::success;
///
/// success!("Sorted {} tracks in playlist {}", 42, "37i9dQZF1DXcBWIGoYBM5M");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ($crate::__status_line!(println, "✓", green, $($arg)*))
}

/// Prints a yellow `[!]` line on stdout. The command keeps going.
///
/// For conditions the user should notice but that do not stop the run, like
/// a playlist that was skipped.
///
/// # Arguments
///
/// Same as `println!`.
///
/// # Example
///
/// ```
/// use plsort::warning;
///
/// warning!("Auto-sort is disabled for {}", "Road Trip");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ($crate::__status_line!(println, "!", yellow, $($arg)*))
}

/// Prints a red `[!]` line on stderr and exits with status 1.
///
/// Only for the CLI layer: library code returns [`error::SyncError`] instead.
///
/// # Arguments
///
/// Same as `println!`.
///
/// # Example
///
/// ```no_run
/// use plsort::error;
///
/// let key = "ENCRYPTION_KEY";
/// error!("{key} must be set");
/// // not reached
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    $crate::__status_line!(eprintln, "!", red, $($arg)*);
    std::process::exit(1);
  })
}
