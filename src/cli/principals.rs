use chrono::{DateTime, Utc};

use crate::{
    error, info,
    management::CredentialStore,
    success,
    types::Credential,
};

/// Stores a principal's refresh token. The access token is left expired so
/// the first call obtains a fresh one.
pub async fn add_principal(principal_id: String, refresh_token: String, auto_sort: bool) {
    let (sorter, store) = super::sorter_with_store();

    let credential = Credential {
        principal_id: principal_id.clone(),
        access_token: String::new(),
        refresh_token,
        expires_at: DateTime::<Utc>::UNIX_EPOCH,
    };

    if let Err(e) = store.put(&principal_id, credential).await {
        error!("Cannot store credential. Err: {}", e);
    }
    info!("Encrypted credential stored in {}", store.root().display());
    if let Err(e) = sorter.set_principal_auto_sort(&principal_id, auto_sort).await {
        error!("Cannot store preferences. Err: {}", e);
    }

    match sorter.tokens().access_token(&principal_id).await {
        Ok(_) => success!("User {} added and authorized", principal_id),
        Err(e) => error!("Refresh token was rejected. Err: {}", e),
    }
}

pub async fn set_principal_auto_sort(principal_id: String, enabled: bool) {
    let sorter = super::sorter();

    match sorter.set_principal_auto_sort(&principal_id, enabled).await {
        Ok(()) if enabled => success!("Auto-sort enabled for user {}", principal_id),
        Ok(()) => info!("Auto-sort disabled for user {}", principal_id),
        Err(e) => error!("Cannot update user {}. Err: {}", principal_id, e),
    }
}
