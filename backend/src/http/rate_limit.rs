//! Fixed-window request counter per tenant.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::TenantId;

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    window: Duration,
    counters: Mutex<HashMap<TenantId, Window>>,
}

impl RateLimiter {
    pub fn per_minute() -> Self {
        Self::with_window(Duration::from_secs(60))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request against `limit` for the current window.
    ///
    /// Returns the requests left, or `Err(seconds)` until the window resets.
    /// A limit of 0 disables the check.
    pub fn check(&self, tenant: TenantId, limit: u32) -> Result<u32, u64> {
        if limit == 0 {
            return Ok(u32::MAX);
        }
        let now = Instant::now();
        let mut counters = self.counters.lock();
        let entry = counters.entry(tenant).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= limit {
            let elapsed = now.duration_since(entry.started);
            let retry = self.window.saturating_sub(elapsed).as_secs().max(1);
            return Err(retry);
        }
        entry.count += 1;
        Ok(limit - entry.count)
    }

    pub fn reset(&self) {
        self.counters.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_per_tenant() {
        let limiter = RateLimiter::per_minute();
        let (a, b) = (TenantId::generate(), TenantId::generate());

        assert_eq!(limiter.check(a, 2), Ok(1));
        assert_eq!(limiter.check(a, 2), Ok(0));
        let retry = limiter.check(a, 2).unwrap_err();
        assert!((1..=60).contains(&retry));

        assert_eq!(limiter.check(b, 2), Ok(1));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::with_window(Duration::from_millis(20));
        let tenant = TenantId::generate();
        assert!(limiter.check(tenant, 1).is_ok());
        assert!(limiter.check(tenant, 1).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(tenant, 1).is_ok());
    }

    #[test]
    fn test_zero_disables() {
        let limiter = RateLimiter::per_minute();
        let tenant = TenantId::generate();
        for _ in 0..1_000 {
            assert!(limiter.check(tenant, 0).is_ok());
        }
    }
}
