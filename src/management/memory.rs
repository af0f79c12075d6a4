use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::store::{AuditStore, CredentialStore, PreferenceStore};
use crate::{
    error::{Result, SyncError},
    types::{Credential, PlaylistPreference, PrincipalPreference, SortOutcome},
};

pub(crate) type CredentialMap = BTreeMap<String, Credential>;

/// In-process store. Holds everything in memory behind one async mutex.
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<CredentialMap>,
    preferences: Mutex<Vec<PrincipalPreference>>,
    outcomes: Mutex<Vec<SortOutcome>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a principal with its credential and auto-sort flag.
    pub async fn add_principal(&self, credential: Credential, auto_sort_enabled: bool) {
        let principal_id = credential.principal_id.clone();
        self.credentials
            .lock()
            .await
            .insert(principal_id.clone(), credential);
        set_principal_flag(
            &mut *self.preferences.lock().await,
            &principal_id,
            auto_sort_enabled,
        );
    }

    /// Snapshot of every recorded outcome, oldest first.
    pub async fn all_outcomes(&self) -> Vec<SortOutcome> {
        self.outcomes.lock().await.clone()
    }
}

pub(crate) fn lookup_credential(map: &CredentialMap, principal_id: &str) -> Result<Credential> {
    map.get(principal_id)
        .cloned()
        .ok_or_else(|| SyncError::Auth(format!("no credential stored for {principal_id}")))
}

pub(crate) fn set_principal_flag(
    prefs: &mut Vec<PrincipalPreference>,
    principal_id: &str,
    enabled: bool,
) {
    match prefs.iter_mut().find(|p| p.principal_id == principal_id) {
        Some(principal) => principal.auto_sort_enabled = enabled,
        None => prefs.push(PrincipalPreference {
            principal_id: principal_id.to_string(),
            auto_sort_enabled: enabled,
            playlists: Vec::new(),
        }),
    }
}

pub(crate) fn enabled_principals(prefs: &[PrincipalPreference]) -> Vec<String> {
    prefs
        .iter()
        .filter(|p| p.auto_sort_enabled)
        .map(|p| p.principal_id.clone())
        .collect()
}

pub(crate) fn playlists_of(
    prefs: &[PrincipalPreference],
    principal_id: &str,
) -> Vec<PlaylistPreference> {
    prefs
        .iter()
        .find(|p| p.principal_id == principal_id)
        .map(|p| p.playlists.clone())
        .unwrap_or_default()
}

pub(crate) fn upsert_playlist(
    prefs: &mut Vec<PrincipalPreference>,
    principal_id: &str,
    playlist_id: &str,
    name: &str,
    auto_sort: Option<bool>,
) {
    if !prefs.iter().any(|p| p.principal_id == principal_id) {
        set_principal_flag(prefs, principal_id, false);
    }
    let Some(principal) = prefs.iter_mut().find(|p| p.principal_id == principal_id) else {
        return;
    };

    match principal
        .playlists
        .iter_mut()
        .find(|p| p.playlist_id == playlist_id)
    {
        Some(existing) => {
            existing.name = name.to_string();
            if let Some(enabled) = auto_sort {
                existing.auto_sort_enabled = enabled;
            }
        }
        None => principal.playlists.push(PlaylistPreference {
            playlist_id: playlist_id.to_string(),
            name: name.to_string(),
            auto_sort_enabled: auto_sort.unwrap_or(true),
            last_sorted_at: None,
        }),
    }
}

/// Returns false when the playlist is not registered.
pub(crate) fn mark_sorted(
    prefs: &mut [PrincipalPreference],
    principal_id: &str,
    playlist_id: &str,
    at: DateTime<Utc>,
) -> bool {
    let playlist = prefs
        .iter_mut()
        .filter(|p| p.principal_id == principal_id)
        .flat_map(|p| p.playlists.iter_mut())
        .find(|p| p.playlist_id == playlist_id);

    match playlist {
        Some(playlist) => {
            playlist.last_sorted_at = Some(at);
            true
        }
        None => false,
    }
}

pub(crate) fn latest_outcomes(
    outcomes: &[SortOutcome],
    principal_id: &str,
    limit: usize,
) -> Vec<SortOutcome> {
    outcomes
        .iter()
        .rev()
        .filter(|o| o.principal_id == principal_id)
        .take(limit)
        .cloned()
        .collect()
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, principal_id: &str) -> Result<Credential> {
        lookup_credential(&*self.credentials.lock().await, principal_id)
    }

    async fn put(&self, principal_id: &str, credential: Credential) -> Result<()> {
        self.credentials
            .lock()
            .await
            .insert(principal_id.to_string(), credential);
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn auto_sort_principals(&self) -> Result<Vec<String>> {
        Ok(enabled_principals(&self.preferences.lock().await))
    }

    async fn set_principal_auto_sort(&self, principal_id: &str, enabled: bool) -> Result<()> {
        set_principal_flag(&mut *self.preferences.lock().await, principal_id, enabled);
        Ok(())
    }

    async fn playlists(&self, principal_id: &str) -> Result<Vec<PlaylistPreference>> {
        Ok(playlists_of(&self.preferences.lock().await, principal_id))
    }

    async fn upsert_playlist(
        &self,
        principal_id: &str,
        playlist_id: &str,
        name: &str,
        auto_sort: Option<bool>,
    ) -> Result<()> {
        upsert_playlist(
            &mut *self.preferences.lock().await,
            principal_id,
            playlist_id,
            name,
            auto_sort,
        );
        Ok(())
    }

    async fn mark_sorted(
        &self,
        principal_id: &str,
        playlist_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        mark_sorted(
            &mut self.preferences.lock().await,
            principal_id,
            playlist_id,
            at,
        );
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, outcome: SortOutcome) -> Result<()> {
        self.outcomes.lock().await.push(outcome);
        Ok(())
    }

    async fn outcomes(&self, principal_id: &str, limit: usize) -> Result<Vec<SortOutcome>> {
        Ok(latest_outcomes(
            &self.outcomes.lock().await,
            principal_id,
            limit,
        ))
    }
}
