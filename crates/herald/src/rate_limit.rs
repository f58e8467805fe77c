//! Per-source sliding-window throttle for OTP issuance.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::Clock;

/// Result of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Rejected { retry_after_secs: u64 },
}

pub struct RateLimiter {
    /// Admitted request timestamps per source, oldest first
    windows: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    window: Duration,
    max_requests: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            max_requests,
            clock,
        }
    }

    /// Admit and record a request from `source`, or reject it without
    /// recording anything.
    pub async fn check(&self, source: &str) -> Admission {
        let now = self.clock.now();
        let cutoff = now - self.window;

        let mut windows = self.windows.lock().await;
        let timestamps = windows.entry(source.to_string()).or_default();
        while timestamps.front().is_some_and(|ts| *ts <= cutoff) {
            timestamps.pop_front();
        }

        if timestamps.len() as u32 >= self.max_requests {
            let retry_after_secs = timestamps
                .front()
                .map(|oldest| (*oldest + self.window - now).num_seconds().max(1) as u64)
                .unwrap_or(1);

            tracing::warn!(source = %source, "Rate limit exceeded");
            return Admission::Rejected { retry_after_secs };
        }

        timestamps.push_back(now);
        Admission::Admitted {
            remaining: self.max_requests - timestamps.len() as u32,
        }
    }

    /// Drop sources with no requests left in the window
    pub async fn prune(&self) -> usize {
        let cutoff = self.clock.now() - self.window;
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, timestamps| timestamps.back().is_some_and(|ts| *ts > cutoff));
        before - windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(clock: Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(Duration::seconds(900), 15, clock)
    }

    #[tokio::test]
    async fn test_sixteenth_request_rejected() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = limiter(clock.clone());

        for i in 0..15 {
            let admission = limiter.check("10.0.0.1").await;
            assert_eq!(admission, Admission::Admitted { remaining: 14 - i });
            clock.advance(Duration::seconds(1));
        }

        assert!(matches!(
            limiter.check("10.0.0.1").await,
            Admission::Rejected { .. }
        ));

        // Other sources keep their own budget
        assert!(matches!(
            limiter.check("10.0.0.2").await,
            Admission::Admitted { .. }
        ));
    }

    #[tokio::test]
    async fn test_rejection_does_not_consume_budget() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = limiter(clock.clone());

        for _ in 0..15 {
            limiter.check("src").await;
        }
        for _ in 0..10 {
            limiter.check("src").await;
        }

        // Only the 15 admitted requests count, so the window clears on time
        clock.advance(Duration::seconds(901));
        assert_eq!(limiter.check("src").await, Admission::Admitted { remaining: 14 });
    }

    #[tokio::test]
    async fn test_window_slides() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = limiter(clock.clone());

        limiter.check("src").await;
        clock.advance(Duration::seconds(600));
        for _ in 0..14 {
            limiter.check("src").await;
        }

        match limiter.check("src").await {
            Admission::Rejected { retry_after_secs } => assert_eq!(retry_after_secs, 300),
            other => panic!("expected rejection, got {:?}", other),
        }

        // The first request leaves the window after 900s
        clock.advance(Duration::seconds(300));
        assert!(matches!(limiter.check("src").await, Admission::Admitted { .. }));
    }

    #[tokio::test]
    async fn test_prune_drops_idle_sources() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = limiter(clock.clone());

        limiter.check("a").await;
        clock.advance(Duration::seconds(901));
        limiter.check("b").await;

        assert_eq!(limiter.prune().await, 1);
    }
}
