//! # Playlist Synchronization
//!
//! Rewrites playlists into canonical order without ever losing a track.
//!
//! - [`replace`] - the guarded write protocol (set, or clear and append in chunks,
//!   then verify the resulting count)
//! - [`sort`] - [`PlaylistSorter`], the single-playlist sort shared by the
//!   interactive and scheduled paths, plus playlist registration
//! - [`batch`] - the scheduled run over every opted-in principal
//!
//! Both entry points go through [`PlaylistSorter::sort_with_client`], so the
//! safety checks cannot diverge between them.

pub mod batch;
pub mod replace;
pub mod sort;

pub use replace::replace_tracks;
pub use sort::PlaylistSorter;
