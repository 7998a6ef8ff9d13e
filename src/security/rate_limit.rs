//! Fixed-window rate limiter.
//!
//! Each identifier gets a counter that resets at a fixed boundary
//! (`reset_time`). The window is not sliding: a burst straddling a boundary
//! can admit up to `2 × max_requests` requests. State lives in process
//! memory only, so separate processes keep separate counters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::security::clock::{system_clock, Clock};

/// Per-identifier counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Requests admitted in this window. Never exceeds `max_requests`.
    pub count: u32,
    /// Epoch milliseconds at which this window ends.
    pub reset_time: u64,
}

impl RateWindow {
    fn is_active(&self, now: u64) -> bool {
        now < self.reset_time
    }
}

/// In-memory fixed-window limiter keyed by caller-supplied identifiers.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    window_ms: u64,
    max_requests: u32,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self::with_clock(window, max_requests, system_clock())
    }

    pub fn with_clock(window: Duration, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
            max_requests,
            clock,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Number of identifiers currently tracked (active or stale).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a request for `identifier` and report whether it is admitted.
    ///
    /// A missing or expired window is replaced by a fresh one with
    /// `count = 1`. Rejected requests do not increment the counter.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        self.check(identifier).0
    }

    /// Same as [`is_allowed`](Self::is_allowed), also returning the window
    /// the decision was made against, read under the same lock.
    pub fn check(&self, identifier: &str) -> (bool, RateWindow) {
        let now = self.clock.now_ms();
        let mut windows = self.lock();

        if let Some(window) = windows.get_mut(identifier) {
            if window.is_active(now) {
                let allowed = window.count < self.max_requests;
                if allowed {
                    window.count += 1;
                }
                return (allowed, *window);
            }
        }

        let window = RateWindow {
            count: 1,
            reset_time: now.saturating_add(self.window_ms),
        };
        windows.insert(identifier.to_string(), window);
        (true, window)
    }

    /// Requests left in `window` under this limiter's maximum.
    pub fn remaining_in(&self, window: &RateWindow) -> u32 {
        self.max_requests.saturating_sub(window.count)
    }

    /// Requests still admissible in the current window.
    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        let now = self.clock.now_ms();
        match self.active_window(identifier, now) {
            Some(window) => self.remaining_in(&window),
            None => self.max_requests,
        }
    }

    /// End of the active window, or when a window opened now would end.
    pub fn reset_time(&self, identifier: &str) -> u64 {
        let now = self.clock.now_ms();
        match self.active_window(identifier, now) {
            Some(window) => window.reset_time,
            None => now.saturating_add(self.window_ms),
        }
    }

    /// Snapshot of the stored window, including stale ones.
    pub fn window(&self, identifier: &str) -> Option<RateWindow> {
        self.lock().get(identifier).copied()
    }

    /// Drop windows that ended more than one window duration ago.
    ///
    /// Returns the number of identifiers removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let window_ms = self.window_ms;
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, window| now.saturating_sub(window.reset_time) <= window_ms);
        before - windows.len()
    }

    fn active_window(&self, identifier: &str, now: u64) -> Option<RateWindow> {
        self.lock()
            .get(identifier)
            .copied()
            .filter(|window| window.is_active(now))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        self.windows.lock().expect("rate limiter mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    const START: u64 = 1_700_000_000_000;

    fn limiter(window_ms: u64, max: u32) -> (FixedWindowRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let limiter =
            FixedWindowRateLimiter::with_clock(Duration::from_millis(window_ms), max, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_fresh_identifier_is_allowed() {
        let (limiter, _) = limiter(60_000, 5);
        assert_eq!(limiter.remaining_requests("ip1"), 5);
        assert!(limiter.is_allowed("ip1"));
        assert_eq!(limiter.remaining_requests("ip1"), 4);
    }

    #[test]
    fn test_rejects_after_max_requests() {
        let (limiter, _) = limiter(60_000, 5);
        for _ in 0..5 {
            assert!(limiter.is_allowed("ip1"));
        }
        assert_eq!(limiter.remaining_requests("ip1"), 0);
        assert!(!limiter.is_allowed("ip1"));
        assert!(!limiter.is_allowed("ip1"));

        // Rejections do not increment the counter
        assert_eq!(limiter.window("ip1").unwrap().count, 5);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _) = limiter(60_000, 1);
        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));
    }

    #[test]
    fn test_window_resets_after_duration() {
        let (limiter, clock) = limiter(60_000, 2);
        assert!(limiter.is_allowed("ip1"));
        assert!(limiter.is_allowed("ip1"));
        assert!(!limiter.is_allowed("ip1"));

        clock.advance(Duration::from_millis(59_999));
        assert!(!limiter.is_allowed("ip1"));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.is_allowed("ip1"));
        assert_eq!(limiter.remaining_requests("ip1"), 1);
        assert_eq!(limiter.reset_time("ip1"), START + 120_000);
    }

    #[test]
    fn test_boundary_burst_admits_twice_the_limit() {
        let (limiter, clock) = limiter(1_000, 3);
        clock.advance(Duration::from_millis(999));
        let first: usize = (0..3).filter(|_| limiter.is_allowed("ip")).count();
        clock.advance(Duration::from_millis(1_000));
        let second: usize = (0..3).filter(|_| limiter.is_allowed("ip")).count();
        assert_eq!(first + second, 6);
    }

    #[test]
    fn test_reset_time_for_fresh_identifier() {
        let (limiter, clock) = limiter(60_000, 5);
        let now = clock.now_ms();
        let reset = limiter.reset_time("nobody");
        assert!(reset >= now && reset <= now + 60_000);
    }

    #[test]
    fn test_reset_time_tracks_active_window() {
        let (limiter, clock) = limiter(60_000, 5);
        limiter.is_allowed("ip1");
        clock.advance(Duration::from_secs(10));
        assert_eq!(limiter.reset_time("ip1"), START + 60_000);

        clock.advance(Duration::from_secs(60));
        // Expired window reports a prospective reset and full quota
        assert_eq!(limiter.reset_time("ip1"), START + 130_000);
        assert_eq!(limiter.remaining_requests("ip1"), 5);
    }

    #[test]
    fn test_cleanup_drops_only_stale_windows() {
        let (limiter, clock) = limiter(1_000, 5);
        limiter.is_allowed("old");
        clock.advance(Duration::from_millis(1_500));
        limiter.is_allowed("new");

        // "old" ended 500ms ago, still within one window duration
        assert_eq!(limiter.cleanup(), 0);

        clock.advance(Duration::from_millis(1_000));
        assert_eq!(limiter.cleanup(), 1);
        assert!(limiter.window("old").is_none());
        assert!(limiter.window("new").is_some());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let (limiter, clock) = limiter(1_000, 5);
        for id in ["a", "b", "c"] {
            limiter.is_allowed(id);
        }
        clock.advance(Duration::from_millis(1_200));
        limiter.is_allowed("d");
        clock.advance(Duration::from_millis(1_000));

        limiter.cleanup();
        let after_first: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| limiter.window(id)).collect();
        assert_eq!(limiter.cleanup(), 0);
        let after_second: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| limiter.window(id)).collect();
        assert_eq!(after_first, after_second);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_check_returns_window_behind_decision() {
        let (limiter, clock) = limiter(60_000, 2);
        let (allowed, window) = limiter.check("ip1");
        assert!(allowed);
        assert_eq!(window, RateWindow { count: 1, reset_time: START + 60_000 });
        assert_eq!(limiter.remaining_in(&window), 1);

        limiter.check("ip1");
        clock.advance(Duration::from_secs(30));
        let (allowed, window) = limiter.check("ip1");
        assert!(!allowed);
        // The rejection reports the window that is still running
        assert_eq!(window.reset_time, START + 60_000);
        assert_eq!(limiter.remaining_in(&window), 0);
    }

    #[test]
    fn test_oversized_window_saturates() {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = FixedWindowRateLimiter::with_clock(Duration::MAX, 1, clock);
        assert_eq!(limiter.window_ms(), u64::MAX);
        assert_eq!(limiter.reset_time("ip1"), u64::MAX);

        let (allowed, window) = limiter.check("ip1");
        assert!(allowed);
        assert_eq!(window.reset_time, u64::MAX);
        assert!(!limiter.is_allowed("ip1"));
        assert_eq!(limiter.cleanup(), 0);
    }
}
