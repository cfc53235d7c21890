//! Per-client rate limiting.
//!
//! Fixed-window-with-reset semantics: each client gets a window start and
//! a count, and the count resets (never decrements) once the window has
//! lapsed. This admits short bursts across a window boundary that a true
//! sliding log would reject, in exchange for O(1) memory per client.

use dashmap::DashMap;
use thiserror::Error;

use crate::auth::ClientIdentity;
use crate::config::schema::RateLimitConfig;
use crate::observability::metrics;

/// Rejection carrying the seconds until the client's window resets.
/// Surfaced as 429 with a Retry-After header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit exceeded, retry in {retry_after}s")]
pub struct RateLimitError {
    pub retry_after: u64,
}

struct WindowEntry {
    window_start: u64,
    count: u32,
}

/// Tracks request counts per client identity inside fixed time windows.
pub struct RateLimiter {
    enabled: bool,
    max_requests: u32,
    window_secs: u64,
    max_clients: usize,
    windows: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_requests: config.max_requests,
            window_secs: config.window_secs,
            max_clients: config.max_clients,
            windows: DashMap::new(),
        }
    }

    /// Check and record one request for the identity at the given unix
    /// time. The map's per-key entry lock makes the read-check-update
    /// atomic: two concurrent admits for one identity cannot both observe
    /// a count below the maximum.
    pub fn admit(&self, identity: &ClientIdentity, now: u64) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }

        if self.windows.len() >= self.max_clients && !self.windows.contains_key(&identity.subject)
        {
            self.sweep_lapsed(now);
        }

        let mut entry = self
            .windows
            .entry(identity.subject.clone())
            .or_insert(WindowEntry {
                window_start: now,
                count: 0,
            });
        let window = entry.value_mut();

        if now >= window.window_start + self.window_secs {
            window.window_start = now;
            window.count = 0;
        }

        if window.count < self.max_requests {
            window.count += 1;
            return Ok(());
        }

        let retry_after = (window.window_start + self.window_secs).saturating_sub(now);
        drop(entry);

        tracing::warn!(
            client = %identity.subject,
            retry_after,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();
        Err(RateLimitError { retry_after })
    }

    /// Drop windows that have already lapsed; they carry no admission
    /// state worth keeping.
    fn sweep_lapsed(&self, now: u64) {
        self.windows
            .retain(|_, window| now < window.window_start + self.window_secs);
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::from_config(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs,
            max_clients: 1024,
        })
    }

    fn client(subject: &str) -> ClientIdentity {
        ClientIdentity {
            subject: subject.to_string(),
            scopes: Vec::new(),
        }
    }

    #[test]
    fn admits_up_to_max_then_rejects_with_retry_after() {
        let limiter = limiter(3, 60);
        let a = client("a");

        assert!(limiter.admit(&a, 0).is_ok());
        assert!(limiter.admit(&a, 1).is_ok());
        assert!(limiter.admit(&a, 5).is_ok());

        let err = limiter.admit(&a, 10).unwrap_err();
        assert_eq!(err.retry_after, 50);

        // A full window after the first call, the window resets.
        assert!(limiter.admit(&a, 61).is_ok());
    }

    #[test]
    fn count_resets_rather_than_decrements() {
        let limiter = limiter(2, 10);
        let a = client("a");

        assert!(limiter.admit(&a, 0).is_ok());
        assert!(limiter.admit(&a, 0).is_ok());
        assert!(limiter.admit(&a, 9).is_err());

        // After the reset the full budget is available again.
        assert!(limiter.admit(&a, 10).is_ok());
        assert!(limiter.admit(&a, 10).is_ok());
        assert!(limiter.admit(&a, 10).is_err());
    }

    #[test]
    fn identities_are_limited_independently() {
        let limiter = limiter(1, 60);
        assert!(limiter.admit(&client("a"), 0).is_ok());
        assert!(limiter.admit(&client("b"), 0).is_ok());
        assert!(limiter.admit(&client("a"), 1).is_err());
    }

    #[test]
    fn disabled_limiter_always_admits() {
        let limiter = RateLimiter::from_config(&RateLimitConfig {
            enabled: false,
            max_requests: 1,
            window_secs: 60,
            max_clients: 1024,
        });
        let a = client("a");
        for t in 0..10 {
            assert!(limiter.admit(&a, t).is_ok());
        }
    }

    #[test]
    fn concurrent_admits_never_exceed_max() {
        let limiter = Arc::new(limiter(100, 60));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(std::thread::spawn(move || {
                let a = client("a");
                (0..100).filter(|_| limiter.admit(&a, 0).is_ok()).count()
            }));
        }

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    #[test]
    fn lapsed_windows_are_swept_at_capacity() {
        let limiter = RateLimiter::from_config(&RateLimitConfig {
            enabled: true,
            max_requests: 10,
            window_secs: 10,
            max_clients: 4,
        });

        for i in 0..4 {
            assert!(limiter.admit(&client(&format!("c{i}")), 0).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 4);

        // All four windows have lapsed by t=20; a new client triggers the
        // sweep instead of growing the map.
        assert!(limiter.admit(&client("fresh"), 20).is_ok());
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
