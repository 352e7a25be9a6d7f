//! A sliding-window rate limiter used to throttle background refreshes and outbound telemetry.
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};

/// Throttles actions per key over a trailing window.
///
/// Each key tracks the timestamps of accepted actions within the window, oldest first; stale
/// entries are pruned lazily on every check. Throttling on one key never affects another.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    events: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Default trailing window.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

    /// Create a limiter allowing `events_per_minute` actions per key per minute.
    pub fn new(events_per_minute: u32) -> RateLimiter {
        RateLimiter::with_window(events_per_minute, RateLimiter::DEFAULT_WINDOW)
    }

    /// Create a limiter with a custom window.
    pub fn with_window(limit: u32, window: Duration) -> RateLimiter {
        RateLimiter {
            limit,
            window,
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Run `action` if `key` still has capacity in the current window.
    ///
    /// Returns `Some(result)` when the action ran, or `None` when it was throttled. A rejected
    /// action is logged as a warning and not executed.
    pub fn rate_limited<R>(&self, key: &str, action: impl FnOnce() -> R) -> Option<R> {
        self.rate_limited_at(key, Instant::now(), action)
    }

    fn rate_limited_at<R>(&self, key: &str, now: Instant, action: impl FnOnce() -> R) -> Option<R> {
        {
            let mut events = self
                .events
                .lock()
                .expect("thread holding rate limiter lock should not panic");
            let timestamps = events.entry(key.to_owned()).or_default();

            // Oldest-first ordering makes pruning O(removed).
            while timestamps
                .front()
                .is_some_and(|t| now.duration_since(*t) > self.window)
            {
                timestamps.pop_front();
            }

            if timestamps.len() as u32 >= self.limit {
                log::warn!(target: "flagkit", key; "rate limit exceeded");
                return None;
            }

            timestamps.push_back(now);
        }

        // The lock is released before running the action.
        Some(action())
    }
}
