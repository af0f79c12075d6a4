use chrono::NaiveDate;

use crate::error::{Result, SyncError};

const SPOTIFY_ID_LEN: usize = 22;

/// Parses a Spotify release date of any precision.
///
/// `YYYY` and `YYYY-MM` are normalized to the first day of the period.
/// Missing or malformed dates become the Unix epoch, so undated tracks sort
/// as the oldest possible value.
pub fn parse_release_date(release_date: Option<&str>) -> NaiveDate {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let Some(raw) = release_date.map(str::trim).filter(|d| !d.is_empty()) else {
        return epoch;
    };

    let mut parts = raw.splitn(3, '-');
    let year = parts.next().and_then(|y| y.parse::<i32>().ok());
    let month = parts.next().map(|m| m.parse::<u32>().ok());
    let day = parts.next().map(|d| d.parse::<u32>().ok());

    let date = match (year, month, day) {
        (Some(y), None, None) => NaiveDate::from_ymd_opt(y, 1, 1),
        (Some(y), Some(Some(m)), None) => NaiveDate::from_ymd_opt(y, m, 1),
        (Some(y), Some(Some(m)), Some(Some(d))) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };

    date.unwrap_or(epoch)
}

/// Removes control characters and surrounding whitespace.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Checks the shape of a Spotify playlist id: 22 ASCII alphanumerics.
pub fn validate_playlist_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.len() != SPOTIFY_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SyncError::InvalidInput(
            "playlist id must be 22 alphanumeric characters".to_string(),
        ));
    }
    Ok(id)
}

/// Number of pages of `page_size` needed for `remaining` items.
pub fn remaining_pages(remaining: u32, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    remaining.div_ceil(page_size)
}
