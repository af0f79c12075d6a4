use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::Utc;
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tracing::{debug, info, warn};

use super::store::CredentialStore;
use crate::{
    config::SyncSettings,
    error::{Result, SyncError},
    spotify::auth::TokenEndpoint,
    types::Credential,
};

type RefreshTask = Shared<BoxFuture<'static, Result<Credential>>>;

struct RefreshLock {
    generation: u64,
    task: RefreshTask,
    expires_at: Instant,
}

/// Why a refresh is requested.
#[derive(Debug, Clone)]
enum Trigger {
    /// The stored credential is inside the expiry margin.
    Expired,
    /// Spotify answered 401 for this access token.
    Rejected(String),
}

/// Keeps access tokens valid, refreshing at most once per principal at a time.
///
/// Concurrent callers for the same principal share one in-flight refresh
/// future. Lock entries carry an expiry and are swept lazily on access, so a
/// hung refresh never blocks a principal for longer than the lock TTL.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    endpoint: TokenEndpoint,
    locks: Mutex<HashMap<String, RefreshLock>>,
    generation: AtomicU64,
    expiry_margin: Duration,
    lock_ttl: Duration,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        endpoint: TokenEndpoint,
        settings: &SyncSettings,
    ) -> Self {
        TokenManager {
            store,
            endpoint,
            locks: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            expiry_margin: settings.expiry_margin,
            lock_ttl: settings.lock_ttl,
        }
    }

    /// Returns a usable access token for the credential, refreshing if it is
    /// within the expiry margin.
    ///
    /// # Errors
    ///
    /// [`SyncError::Auth`] when the refresh is rejected; the caller has to send
    /// the principal through authorization again.
    pub async fn ensure_valid(&self, credential: &Credential) -> Result<String> {
        if !self.is_expired(credential) {
            return Ok(credential.access_token.clone());
        }

        let refreshed = self
            .refresh(&credential.principal_id, Trigger::Expired)
            .await?;
        if self.is_expired(&refreshed) {
            warn!(
                principal = %credential.principal_id,
                "refreshed token already inside the expiry margin"
            );
        }
        Ok(refreshed.access_token)
    }

    /// Loads the principal's credential and returns a valid access token.
    pub async fn access_token(&self, principal_id: &str) -> Result<String> {
        let credential = self.store.get(principal_id).await?;
        self.ensure_valid(&credential).await
    }

    /// Replaces an access token Spotify just rejected.
    ///
    /// If another task already rotated the stored token, that token is
    /// returned without a new refresh call.
    pub async fn refresh_rejected(&self, principal_id: &str, rejected: &str) -> Result<String> {
        let credential = self
            .refresh(principal_id, Trigger::Rejected(rejected.to_string()))
            .await?;
        Ok(credential.access_token)
    }

    fn is_expired(&self, credential: &Credential) -> bool {
        credential.is_expired(Utc::now(), self.expiry_margin)
    }

    async fn refresh(&self, principal_id: &str, trigger: Trigger) -> Result<Credential> {
        let (generation, task) = self.acquire(principal_id, trigger);
        let result = task.await;
        self.release(principal_id, generation);
        result
    }

    /// Joins the in-flight refresh of the principal or starts a new one.
    fn acquire(&self, principal_id: &str, trigger: Trigger) -> (u64, RefreshTask) {
        let now = Instant::now();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        locks.retain(|principal, lock| {
            let live = lock.expires_at > now;
            if !live {
                warn!(principal = %principal, "dropping stale refresh lock");
            }
            live
        });

        if let Some(lock) = locks.get(principal_id) {
            debug!(principal = %principal_id, "joining in-flight refresh");
            return (lock.generation, lock.task.clone());
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let task = refresh_task(
            Arc::clone(&self.store),
            self.endpoint.clone(),
            principal_id.to_string(),
            trigger,
            self.expiry_margin,
        )
        .boxed()
        .shared();

        locks.insert(
            principal_id.to_string(),
            RefreshLock {
                generation,
                task: task.clone(),
                expires_at: now + self.lock_ttl,
            },
        );
        (generation, task)
    }

    fn release(&self, principal_id: &str, generation: u64) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(principal_id)
            .is_some_and(|lock| lock.generation == generation)
        {
            locks.remove(principal_id);
        }
    }
}

/// Reads the latest credential, refreshes it if still needed and persists
/// the result before any waiter sees it.
async fn refresh_task(
    store: Arc<dyn CredentialStore>,
    endpoint: TokenEndpoint,
    principal_id: String,
    trigger: Trigger,
    margin: Duration,
) -> Result<Credential> {
    let current = store.get(&principal_id).await?;

    // a refresh that completed just before this one may already cover us
    let still_needed = match &trigger {
        Trigger::Expired => current.is_expired(Utc::now(), margin),
        Trigger::Rejected(token) => current.access_token == *token,
    };
    if !still_needed {
        debug!(principal = %principal_id, "credential already rotated");
        return Ok(current);
    }

    let token = endpoint.refresh(&current.refresh_token).await.map_err(|e| match e {
        SyncError::Auth(_) => e,
        other => SyncError::Auth(format!("token refresh failed: {other}")),
    })?;

    let next = token.into_credential(&current, Utc::now())?;
    store.put(&principal_id, next.clone()).await?;
    info!(principal = %principal_id, expires_at = %next.expires_at, "credential refreshed");
    Ok(next)
}
