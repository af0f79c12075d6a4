use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    cipher::TokenCipher,
    memory::{self, CredentialMap},
    store::{AuditStore, CredentialStore, PreferenceStore},
};
use crate::{
    error::Result,
    types::{Credential, PlaylistPreference, PrincipalPreference, SortOutcome},
};

const CREDENTIALS_FILE: &str = "credentials.json";
const PREFERENCES_FILE: &str = "preferences.json";
const AUDIT_FILE: &str = "audit.json";

/// JSON documents in a data directory.
///
/// Every operation is a read-modify-write of one document, serialized by a
/// single async mutex so concurrent tasks of this process do not lose updates.
/// Access and refresh tokens are sealed with the [`TokenCipher`] before they
/// are written.
pub struct FileStore {
    root: PathBuf,
    cipher: TokenCipher,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, cipher: TokenCipher) -> Self {
        Self {
            root: root.into(),
            cipher,
            guard: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(T::default());
        }
        let content = async_fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn persist<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        async_fs::create_dir_all(&self.root).await?;

        let json = serde_json::to_string_pretty(value)?;
        // write-then-rename so a crash never leaves a truncated document
        let tmp = self.root.join(format!("{name}.tmp"));
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, self.root.join(name)).await?;
        debug!(file = name, "store document written");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, principal_id: &str) -> Result<Credential> {
        let _guard = self.guard.lock().await;
        let credentials: CredentialMap = self.load(CREDENTIALS_FILE).await?;
        let sealed = memory::lookup_credential(&credentials, principal_id)?;
        Ok(Credential {
            access_token: self.cipher.open(&sealed.access_token)?,
            refresh_token: self.cipher.open(&sealed.refresh_token)?,
            ..sealed
        })
    }

    async fn put(&self, principal_id: &str, credential: Credential) -> Result<()> {
        let sealed = Credential {
            access_token: self.cipher.seal(&credential.access_token)?,
            refresh_token: self.cipher.seal(&credential.refresh_token)?,
            ..credential
        };
        let _guard = self.guard.lock().await;
        let mut credentials: CredentialMap = self.load(CREDENTIALS_FILE).await?;
        credentials.insert(principal_id.to_string(), sealed);
        self.persist(CREDENTIALS_FILE, &credentials).await
    }
}

#[async_trait]
impl PreferenceStore for FileStore {
    async fn auto_sort_principals(&self) -> Result<Vec<String>> {
        let _guard = self.guard.lock().await;
        let prefs: Vec<PrincipalPreference> = self.load(PREFERENCES_FILE).await?;
        Ok(memory::enabled_principals(&prefs))
    }

    async fn set_principal_auto_sort(&self, principal_id: &str, enabled: bool) -> Result<()> {
        let _guard = self.guard.lock().await;
        let mut prefs: Vec<PrincipalPreference> = self.load(PREFERENCES_FILE).await?;
        memory::set_principal_flag(&mut prefs, principal_id, enabled);
        self.persist(PREFERENCES_FILE, &prefs).await
    }

    async fn playlists(&self, principal_id: &str) -> Result<Vec<PlaylistPreference>> {
        let _guard = self.guard.lock().await;
        let prefs: Vec<PrincipalPreference> = self.load(PREFERENCES_FILE).await?;
        Ok(memory::playlists_of(&prefs, principal_id))
    }

    async fn upsert_playlist(
        &self,
        principal_id: &str,
        playlist_id: &str,
        name: &str,
        auto_sort: Option<bool>,
    ) -> Result<()> {
        let _guard = self.guard.lock().await;
        let mut prefs: Vec<PrincipalPreference> = self.load(PREFERENCES_FILE).await?;
        memory::upsert_playlist(&mut prefs, principal_id, playlist_id, name, auto_sort);
        self.persist(PREFERENCES_FILE, &prefs).await
    }

    async fn mark_sorted(
        &self,
        principal_id: &str,
        playlist_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let _guard = self.guard.lock().await;
        let mut prefs: Vec<PrincipalPreference> = self.load(PREFERENCES_FILE).await?;
        if memory::mark_sorted(&mut prefs, principal_id, playlist_id, at) {
            self.persist(PREFERENCES_FILE, &prefs).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for FileStore {
    async fn append(&self, outcome: SortOutcome) -> Result<()> {
        let _guard = self.guard.lock().await;
        let mut outcomes: Vec<SortOutcome> = self.load(AUDIT_FILE).await?;
        outcomes.push(outcome);
        self.persist(AUDIT_FILE, &outcomes).await
    }

    async fn outcomes(&self, principal_id: &str, limit: usize) -> Result<Vec<SortOutcome>> {
        let _guard = self.guard.lock().await;
        let outcomes: Vec<SortOutcome> = self.load(AUDIT_FILE).await?;
        Ok(memory::latest_outcomes(&outcomes, principal_id, limit))
    }
}
