use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::{Result, SyncError},
    types::{Credential, TokenResponse},
};

/// Client of the OAuth token endpoint, refresh grant only.
///
/// The authorization-code exchange happens elsewhere; this type only renews
/// credentials that are already stored.
#[derive(Clone)]
pub struct TokenEndpoint {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

impl TokenEndpoint {
    pub fn new(http: Client, settings: &Settings) -> Self {
        Self {
            http,
            token_url: settings.token_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            timeout: settings.sync.request_timeout,
        }
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Auth`] when Spotify rejects the refresh token (400/401)
    ///   or answers without an access token
    /// - [`SyncError::Timeout`] when the endpoint does not answer in time
    /// - [`SyncError::Upstream`] for any other non-2xx status
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let request = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ]);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let timed_out = SyncError::Timeout(self.timeout.as_secs());
        let (status, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) if err.is_timeout() => return Err(timed_out),
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(timed_out),
        };

        debug!(status = status.as_u16(), "token endpoint answered");

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            warn!("refresh token rejected by Spotify");
            return Err(SyncError::Auth(
                "refresh token is invalid or expired".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(SyncError::Upstream {
                status: status.as_u16(),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        if token.access_token.is_empty() {
            return Err(SyncError::Auth(
                "token response without access token".to_string(),
            ));
        }
        Ok(token)
    }
}

impl TokenResponse {
    /// Builds the next credential. A missing refresh token keeps the old one.
    ///
    /// # Errors
    ///
    /// [`SyncError::Auth`] when `expires_in` does not fit a timestamp.
    pub fn into_credential(self, previous: &Credential, now: DateTime<Utc>) -> Result<Credential> {
        let expires_at = i64::try_from(self.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                SyncError::Auth(format!("token lifetime out of range: {}", self.expires_in))
            })?;

        Ok(Credential {
            principal_id: previous.principal_id.clone(),
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| previous.refresh_token.clone()),
            expires_at,
        })
    }
}
