use std::{
    num::NonZeroU32,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::http::HeaderMap;
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
};
use tracing::debug;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Per-client request budget of an endpoint.
///
/// Owned by the router. Idle client entries are dropped lazily, at most once
/// per sweep interval, when a request comes in.
pub struct RequestLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
    last_sweep: Mutex<Instant>,
}

impl RequestLimiter {
    /// Allows `max_requests` per minute and client, as a burst.
    pub fn per_minute(max_requests: u32) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let clock = DefaultClock::default();
        let limiter = RateLimiter::new(
            Quota::per_minute(burst),
            DefaultKeyedStateStore::default(),
            clock.clone(),
        );
        Self {
            limiter,
            clock,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Counts one request of `client`. On refusal returns how long to wait.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.sweep();
        match self.limiter.check_key(&client.to_string()) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                debug!(client, wait_ms = wait.as_millis() as u64, "request limited");
                Err(wait)
            }
        }
    }

    fn sweep(&self) {
        let mut last = self.last_sweep.lock().unwrap_or_else(|e| e.into_inner());
        if last.elapsed() < SWEEP_INTERVAL {
            return;
        }
        *last = Instant::now();
        self.limiter.retain_recent();
    }
}

/// Address of the calling client as reported by a fronting proxy.
pub fn client_identifier(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    forwarded
        .or(real_ip)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn budget_is_per_client() {
        let limiter = RequestLimiter::per_minute(2);
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());

        let wait = limiter.check("10.0.0.1").unwrap_err();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(60));

        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_identifier(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.7"));
        assert_eq!(client_identifier(&headers).as_deref(), Some("192.0.2.7"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(client_identifier(&headers).as_deref(), Some("203.0.113.5"));
    }
}
