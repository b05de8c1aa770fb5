
use std::collections::{HashMap, VecDeque};

use crate::impl_singleton;


const JOIN_WINDOW_SECONDS: i64 = 60;

/// Sliding windows of recent event timestamps. Message windows are keyed per
/// (guild, user), join windows per guild with a fixed 60 second span. State
/// is in-memory only, a restart resets every window.
pub struct RateLimiter {
    message_windows: HashMap<(u64, u64), VecDeque<i64>>,
    join_windows: HashMap<u64, VecDeque<i64>>,
}

impl RateLimiter {

    pub fn new() -> RateLimiter {
        RateLimiter {
            message_windows: HashMap::new(),
            join_windows: HashMap::new(),
        }
    }

    /// Records `now` for the user and reports whether the window now holds at
    /// least `threshold` events. Thresholds below 2 and windows below 2
    /// seconds are lifted to those minimums, so zeroed configs never trip on
    /// a single message.
    pub fn record_and_check(&mut self, guild_id: u64, user_id: u64, now: i64,
                            threshold: usize, window_seconds: i64) -> bool {
        let threshold = threshold.max(2);
        let window_seconds = window_seconds.max(2);
        let window = self.message_windows.entry((guild_id, user_id)).or_default();
        Self::record(window, now, window_seconds);
        window.len() >= threshold
    }

    /// Join bursts reuse the same primitive keyed by guild only. Returns the
    /// current burst size so the caller can compare against the cap.
    pub fn record_join(&mut self, guild_id: u64, now: i64) -> usize {
        let window = self.join_windows.entry(guild_id).or_default();
        Self::record(window, now, JOIN_WINDOW_SECONDS);
        window.len()
    }

    fn record(window: &mut VecDeque<i64>, now: i64, window_seconds: i64) {
        window.push_back(now);
        while window.front().map_or(false, |&oldest| now - oldest > window_seconds) {
            window.pop_front();
        }
    }
}

impl_singleton!(RateLimiter);
