//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use actlog_core::Principal;
use actlog_service::ActivityService;

use super::RATE_LIMIT_WINDOW_SECS;

/// Requests seen from one client in its current window.
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u64,
    started: Instant,
}

struct Windows {
    by_ip: HashMap<IpAddr, ClientWindow>,
    last_sweep: Instant,
}

/// Fixed-window per-IP rate limiter.
///
/// Clients whose window has expired are dropped at most once per window,
/// so the table only holds clients seen within roughly the last two windows.
pub(crate) struct RateLimiter {
    windows: Mutex<Windows>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(limit: u64) -> Self {
        Self::with_window(limit, Duration::from_secs(RATE_LIMIT_WINDOW_SECS))
    }

    pub(crate) fn with_window(limit: u64, window: Duration) -> Self {
        Self {
            windows: Mutex::new(Windows {
                by_ip: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            limit,
            window,
        }
    }

    /// Count a request from `ip`.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        if now.duration_since(windows.last_sweep) >= self.window {
            let window = self.window;
            windows
                .by_ip
                .retain(|_, w| now.duration_since(w.started) < window);
            windows.last_sweep = now;
        }

        let client = windows.by_ip.entry(ip).or_insert(ClientWindow {
            count: 0,
            started: now,
        });
        if now.duration_since(client.started) >= self.window {
            *client = ClientWindow {
                count: 0,
                started: now,
            };
        }

        client.count += 1;
        if client.count <= self.limit {
            return Ok(());
        }

        let remaining = self
            .window
            .saturating_sub(now.duration_since(client.started));
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Err(secs.max(1))
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.by_ip.len()
    }
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) service: ActivityService,
    pub(crate) rate_limiter: RateLimiter,
    /// Bearer token -> principal.
    pub(crate) tokens: HashMap<String, Principal>,
}

impl AppState {
    pub(crate) fn authenticate(&self, token: &str) -> Option<&Principal> {
        self.tokens.get(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[tokio::test]
    async fn blocks_after_limit_per_ip() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.check(ip(1)).await.is_ok());
        assert!(limiter.check(ip(1)).await.is_ok());
        let retry_after = limiter.check(ip(1)).await.unwrap_err();
        assert!((1..=RATE_LIMIT_WINDOW_SECS).contains(&retry_after));

        assert!(limiter.check(ip(2)).await.is_ok());
    }

    #[tokio::test]
    async fn window_rollover_resets_count() {
        let limiter = RateLimiter::with_window(1, Duration::from_millis(30));
        assert!(limiter.check(ip(1)).await.is_ok());
        assert!(limiter.check(ip(1)).await.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(limiter.check(ip(1)).await.is_ok());
    }

    #[tokio::test]
    async fn expired_clients_are_evicted() {
        let limiter = RateLimiter::with_window(10, Duration::from_millis(30));
        for last in 1..=5 {
            limiter.check(ip(last)).await.unwrap();
        }
        assert_eq!(limiter.tracked_clients().await, 5);

        tokio::time::sleep(Duration::from_millis(50)).await;
        limiter.check(ip(9)).await.unwrap();
        assert_eq!(limiter.tracked_clients().await, 1);
    }
}
