//! Configuration management for plsort.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. The configuration system follows a
//! hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, time::Duration};

use crate::{
    error::{Result, SyncError},
    management::TokenCipher,
};

const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
const PLACEHOLDER_KEY: &str = "change-me";

/// Loads environment variables from `.env` in the local data directory.
///
/// The file lives under `plsort/.env` in the platform data directory:
/// - Linux: `~/.local/share/plsort/.env`
/// - macOS: `~/Library/Application Support/plsort/.env`
/// - Windows: `%LOCALAPPDATA%/plsort/.env`
///
/// A missing file is fine, the process environment is used as is.
///
/// # Errors
///
/// Returns an error if the data directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| SyncError::Config(e.to_string()))?;
    }
    Ok(())
}

/// Root directory for the `.env` file and the JSON stores.
///
/// `PLSORT_DATA_DIR` overrides the platform default.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = env::var("PLSORT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("plsort");
    path
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SyncError::Config(format!("{key} must be set")))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Tunables of the synchronization core.
///
/// Defaults match the platform's documented limits; tests shrink the delays.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// A credential is treated as expired this long before `expires_at`.
    pub expiry_margin: Duration,
    /// Lifetime of a refresh lock entry before it is considered stale.
    pub lock_ttl: Duration,
    /// Budget for a single HTTP call, body included.
    pub request_timeout: Duration,
    /// Used when a 429 carries no usable `Retry-After` header.
    pub default_retry_after: Duration,
    /// Larger `Retry-After` values fail fast instead of sleeping.
    pub max_retry_after: Duration,
    pub chunk_delay: Duration,
    pub playlist_delay: Duration,
    /// Items per set/add call. Spotify accepts at most 100.
    pub write_chunk_size: usize,
    pub playlist_page_size: u32,
    pub track_page_size: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            expiry_margin: Duration::from_secs(5 * 60),
            lock_ttl: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            default_retry_after: Duration::from_secs(60),
            max_retry_after: Duration::from_secs(120),
            chunk_delay: Duration::from_millis(50),
            playlist_delay: Duration::from_millis(100),
            write_chunk_size: 100,
            playlist_page_size: 50,
            track_page_size: 100,
        }
    }
}

/// Application settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub server_address: String,
    /// Bearer secret of the scheduled trigger. `None` disables the endpoint.
    pub cron_secret: Option<String>,
    /// Secret the stored tokens are encrypted with (`ENCRYPTION_KEY`).
    pub encryption_key: Option<String>,
    pub data_dir: PathBuf,
    pub sync: SyncSettings,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Fails with [`SyncError::Config`] if `SPOTIFY_CLIENT_ID` or
    /// `SPOTIFY_CLIENT_SECRET` is missing, or a numeric value does not parse.
    pub fn from_env() -> Result<Self> {
        let mut sync = SyncSettings::default();
        if let Ok(secs) = env::var("PLSORT_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|_| {
                SyncError::Config("PLSORT_REQUEST_TIMEOUT_SECS must be a number".to_string())
            })?;
            sync.request_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            api_url: optional("SPOTIFY_API_URL", DEFAULT_API_URL),
            token_url: optional("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            server_address: optional("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            encryption_key: env::var("ENCRYPTION_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            data_dir: data_dir(),
            sync,
        })
    }

    /// Cipher for the credential file, built from `ENCRYPTION_KEY`.
    ///
    /// # Errors
    ///
    /// [`SyncError::Config`] when the key is missing or still the placeholder
    /// shipped in `.env.example`.
    pub fn token_cipher(&self) -> Result<TokenCipher> {
        match self.encryption_key.as_deref() {
            None => Err(SyncError::Config("ENCRYPTION_KEY must be set".to_string())),
            Some(PLACEHOLDER_KEY) => Err(SyncError::Config(
                "ENCRYPTION_KEY still has the example value".to_string(),
            )),
            Some(key) => TokenCipher::from_secret(key),
        }
    }

    /// Settings pointing at explicit endpoints, used by tests and embedders.
    pub fn with_endpoints(api_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token_url: token_url.into(),
            client_id: String::new(),
            client_secret: String::new(),
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            cron_secret: None,
            encryption_key: None,
            data_dir: data_dir(),
            sync: SyncSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cipher_needs_a_real_key() {
        let mut settings = Settings::with_endpoints("http://api", "http://token");
        assert!(matches!(settings.token_cipher(), Err(SyncError::Config(_))));

        settings.encryption_key = Some(PLACEHOLDER_KEY.to_string());
        assert!(matches!(settings.token_cipher(), Err(SyncError::Config(_))));

        settings.encryption_key = Some("9f2c4e0b7a1d".to_string());
        assert!(settings.token_cipher().is_ok());
    }
}
