//! Fixed-window rate limiting keyed by client identity.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Per-identity counter for the current window. Replaced wholesale once
/// `reset_at` passes, never incremented across windows.
#[derive(Debug)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window request counter.
///
/// The window map is the only shared-mutable state in the service core. It
/// lives behind a single mutex held only for one entry's read-modify-write,
/// never across I/O, so concurrent `allow` calls contend briefly at worst.
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    limit: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    /// Admits or rejects one request from `identity`.
    ///
    /// A fresh window starts at count 1. Within a live window the count never
    /// exceeds the limit: requests over the line are rejected, not counted.
    pub fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        match windows.get_mut(identity) {
            Some(window) if now < window.reset_at => {
                if window.count >= self.limit {
                    false
                } else {
                    window.count += 1;
                    true
                }
            }
            _ => {
                windows.insert(
                    identity.to_owned(),
                    RateWindow {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }

    /// Drops every expired window, bounding memory growth from one-shot
    /// clients. One pass over the map; the lock is not held longer than that.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| window.reset_at > now);
        let dropped = before - windows.len();
        if dropped > 0 {
            debug!(dropped, tracked = windows.len(), "swept expired rate windows");
        }
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }

    /// Starts the background sweep. Spawned once at process initialization;
    /// runs on a fixed interval independent of request traffic.
    pub fn spawn_sweeper(limiter: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick fires immediately; skip it so the sweep cadence
            // starts one interval from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }
}

/// Derives the client identity for rate limiting and access logging.
///
/// Prefers the first comma-separated entry of `x-forwarded-for`, falling
/// back to the transport peer address with its port stripped.
///
/// Deployment precondition: a trusted reverse proxy terminates client
/// connections and sets the header. This is not a defense against header
/// spoofing by direct clients.
pub fn client_identity(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return first.to_owned();
        }
    }
    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> SocketAddr {
        "192.0.2.7:54321".parse().unwrap()
    }

    #[test]
    fn fourth_call_in_the_window_is_rejected() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let results: Vec<bool> = (0..4).map(|_| limiter.allow("client")).collect();
        assert_eq!(results, vec![true, true, true, false]);
    }

    #[test]
    fn identities_do_not_share_windows() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn window_expiry_starts_a_fresh_count() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_millis(20));
        for _ in 0..3 {
            assert!(limiter.allow("client"));
        }
        assert!(!limiter.allow("client"));

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow("client"));
        // Fresh window: two more fit before the limit trips again.
        assert!(limiter.allow("client"));
        assert!(limiter.allow("client"));
        assert!(!limiter.allow("client"));
    }

    #[test]
    fn sweep_drops_only_expired_windows() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_millis(20));
        limiter.allow("old");
        std::thread::sleep(Duration::from_millis(30));
        limiter.allow("fresh");

        limiter.sweep();
        assert_eq!(limiter.tracked(), 1);
        // The surviving window still counts prior requests.
        assert!(limiter.allow("fresh"));
        assert!(limiter.allow("fresh"));
        assert!(!limiter.allow("fresh"));
    }

    #[test]
    fn identity_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_identity(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn identity_falls_back_to_peer_without_port() {
        let headers = HeaderMap::new();
        assert_eq!(client_identity(&headers, peer()), "192.0.2.7");
    }

    #[test]
    fn blank_forwarded_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_identity(&headers, peer()), "192.0.2.7");
    }
}
