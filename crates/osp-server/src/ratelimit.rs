// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-client-IP sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by client IP.
///
/// Each IP keeps a deque of request timestamps; timestamps older than the
/// window expire on every check. State for idle IPs is dropped once their
/// deque drains.
pub struct RateLimiter {
    inner: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Limiter allowing `max_requests` per `window` per IP.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Record one request from `ip`; `false` means the caller is over the
    /// limit and must be rejected.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut table = self.inner.lock().expect("rate limiter lock poisoned");

        // Drop fully drained entries so the table stays bounded by the
        // number of recently active clients.
        table.retain(|_, stamps| {
            while let Some(&front) = stamps.front() {
                if now.duration_since(front) >= self.window {
                    stamps.pop_front();
                } else {
                    break;
                }
            }
            !stamps.is_empty()
        });

        let stamps = table.entry(ip).or_default();
        if stamps.len() as u32 >= self.max_requests {
            return false;
        }
        stamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn admits_up_to_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn limits_are_per_ip() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip(1)));
    }
}
