//! Canonical track order.
//!
//! Newest release first, tracks of one album kept together in disc and track
//! order. The comparator is total: for any two tracks it gives the same answer
//! regardless of call order, which the idempotence check relies on.

use std::cmp::Ordering;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    types::{SortDecision, Track},
    utils,
};

/// Compares two tracks by the canonical keys.
///
/// 1. release date, newest first (undated tracks last)
/// 2. album name, accent and case insensitive
/// 3. disc number
/// 4. track number
/// 5. track title
///
/// Remaining ties break on the raw strings and finally the track id.
pub fn compare_tracks(a: &Track, b: &Track) -> Ordering {
    let date_a = utils::parse_release_date(a.album.release_date.as_deref());
    let date_b = utils::parse_release_date(b.album.release_date.as_deref());

    date_b
        .cmp(&date_a)
        .then_with(|| compare_text(&a.album.name, &b.album.name))
        .then_with(|| a.disc_number.cmp(&b.disc_number))
        .then_with(|| a.track_number.cmp(&b.track_number))
        .then_with(|| compare_text(&a.name, &b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Locale-style string comparison: folded form first, raw form as tiebreak.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns the tracks in canonical order. The sort is stable.
pub fn sort_tracks(tracks: &[Track]) -> Vec<Track> {
    let mut sorted = tracks.to_vec();
    sorted.sort_by(compare_tracks);
    sorted
}

/// True when both sequences hold the same track ids in the same order.
pub fn same_order(current: &[Track], target: &[Track]) -> bool {
    current.len() == target.len()
        && current
            .iter()
            .zip(target.iter())
            .all(|(a, b)| a.id == b.id)
}

/// Computes the target order and whether writing it is needed at all.
pub fn decide(current: &[Track]) -> SortDecision {
    let target = sort_tracks(current);
    let needs_write = !same_order(current, &target);
    SortDecision {
        target,
        needs_write,
    }
}
