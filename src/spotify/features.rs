use super::SpotifyClient;
use crate::{
    error::Result,
    types::{AudioFeatures, AudioFeaturesResponse},
};

/// Spotify accepts at most 100 ids per audio-features request.
const FEATURES_BATCH: usize = 100;

impl SpotifyClient {
    /// Audio features for the given track ids, batched by 100.
    ///
    /// Tracks Spotify has no analysis for come back as null and are dropped,
    /// so the result can be shorter than `track_ids`.
    pub async fn audio_features(&self, track_ids: &[String]) -> Result<Vec<AudioFeatures>> {
        let mut features = Vec::with_capacity(track_ids.len());

        for chunk in track_ids.chunks(FEATURES_BATCH) {
            let endpoint = format!("/audio-features?ids={}", chunk.join(","));
            let response: AudioFeaturesResponse = self.get(&endpoint).await?;
            features.extend(response.audio_features.into_iter().flatten());
        }

        Ok(features)
    }
}
