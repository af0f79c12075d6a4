//! # Spotify Integration Module
//!
//! Everything that talks to the Spotify Web API goes through [`SpotifyClient`],
//! a per-principal client whose single entry point [`SpotifyClient::call`]
//! wraps each request with:
//!
//! - a valid access token from the [`TokenManager`]
//! - a bounded timeout covering the request and its body
//! - one refresh-and-retry on `401 Unauthorized`
//! - one sleep-and-retry on `429 Too Many Requests`, honouring `Retry-After`
//! - a generic [`SyncError::Upstream`] for any other non-2xx answer
//!
//! Retries are single shot. A second 401 or 429 is fatal for the call, and a
//! timed-out request is never replayed because a write of unknown completion
//! status must not be applied twice.
//!
//! ## Submodules
//!
//! - [`auth`] - token endpoint (refresh grant)
//! - [`pagination`] - page cursors and concurrent aggregation
//! - [`playlists`] - playlist listing, track snapshots, set/add tracks
//! - [`features`] - batched audio features

pub mod auth;
pub mod features;
pub mod pagination;
pub mod playlists;

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::{Result, SyncError},
    management::TokenManager,
};

/// Status and body of one HTTP exchange.
struct RawResponse {
    status: StatusCode,
    retry_after: Option<u64>,
    body: String,
}

/// Spotify Web API client acting on behalf of one principal.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    principal_id: String,
    tokens: Arc<TokenManager>,
    timeout: Duration,
    default_retry_after: Duration,
    max_retry_after: Duration,
    pub(crate) playlist_page_size: u32,
    pub(crate) track_page_size: u32,
    pub(crate) write_chunk_size: usize,
    pub(crate) chunk_delay: Duration,
}

impl SpotifyClient {
    pub fn new(
        http: Client,
        settings: &Settings,
        tokens: Arc<TokenManager>,
        principal_id: impl Into<String>,
    ) -> Self {
        let sync = &settings.sync;
        Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            principal_id: principal_id.into(),
            tokens,
            timeout: sync.request_timeout,
            default_retry_after: sync.default_retry_after,
            max_retry_after: sync.max_retry_after,
            playlist_page_size: sync.playlist_page_size,
            track_page_size: sync.track_page_size,
            write_chunk_size: sync.write_chunk_size.clamp(1, 100),
            chunk_delay: sync.chunk_delay,
        }
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Performs a GET request and decodes the JSON answer.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.call(Method::GET, endpoint, None).await
    }

    /// Calls `endpoint` (path relative to the API root, query included).
    ///
    /// # Errors
    ///
    /// - [`SyncError::Auth`] if the token cannot be refreshed or is rejected twice
    /// - [`SyncError::RateLimitExhausted`] if still limited after one backoff
    /// - [`SyncError::Timeout`] if the exchange exceeds the call budget
    /// - [`SyncError::Upstream`] for any other non-2xx status
    /// - [`SyncError::Decode`] if a 2xx body does not match `T`
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_url, endpoint);
        let token = self.tokens.access_token(&self.principal_id).await?;

        let response = self.send(&method, &url, body, &token).await?;

        match response.status {
            StatusCode::UNAUTHORIZED => {
                warn!(%method, endpoint, "access token rejected, refreshing once");
                let token = self
                    .tokens
                    .refresh_rejected(&self.principal_id, &token)
                    .await?;
                let retry = self.send(&method, &url, body, &token).await?;
                self.finish(retry)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = response
                    .retry_after
                    .map(Duration::from_secs)
                    .unwrap_or(self.default_retry_after);
                if wait > self.max_retry_after {
                    warn!(
                        retry_after = wait.as_secs(),
                        "retry-after above ceiling, giving up"
                    );
                    return Err(SyncError::RateLimitExhausted);
                }
                warn!(%method, endpoint, retry_after = wait.as_secs(), "rate limited, retrying once");
                sleep(wait).await;
                let retry = self.send(&method, &url, body, &token).await?;
                self.finish(retry)
            }
            _ => self.finish(response),
        }
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<RawResponse> {
        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(RawResponse {
                status,
                retry_after,
                body,
            })
        };

        let response = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) if err.is_timeout() => {
                return Err(SyncError::Timeout(self.timeout.as_secs()));
            }
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(SyncError::Timeout(self.timeout.as_secs())),
        };

        debug!(%method, status = response.status.as_u16(), "spotify call");
        Ok(response)
    }

    /// Maps the final answer of a call. No retries happen past this point.
    fn finish<T: DeserializeOwned>(&self, response: RawResponse) -> Result<T> {
        match response.status {
            status if status.is_success() => {
                let body = response.body.trim();
                let body = if body.is_empty() { "null" } else { body };
                Ok(serde_json::from_str(body)?)
            }
            StatusCode::UNAUTHORIZED => Err(SyncError::Auth(
                "access token rejected after refresh".to_string(),
            )),
            StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimitExhausted),
            // the body is dropped on purpose, only the status leaves this client
            status => Err(SyncError::Upstream {
                status: status.as_u16(),
            }),
        }
    }
}
