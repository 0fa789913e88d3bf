//! Rolling presence window over reporters
//!
//! A reporter is active while `now - last_seen <= window`. Stale entries
//! are only removed by `evict_stale()`, which the status loop calls once
//! per tick; `active_count()` never relies on eviction having run.

use super::types::{system_clock, Clock};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub struct PresenceTracker {
    last_seen: Mutex<HashMap<String, i64>>,
    window_secs: i64,
    now_fn: Clock,
}

impl PresenceTracker {
    pub fn new(window_secs: i64) -> Self {
        Self::new_with_clock(window_secs, system_clock())
    }

    pub fn new_with_clock(window_secs: i64, now_fn: Clock) -> Self {
        Self {
            last_seen: Mutex::new(HashMap::new()),
            window_secs,
            now_fn,
        }
    }

    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// Record the reporter as seen now (last write wins)
    pub fn touch(&self, reporter_id: &str) {
        let now = (self.now_fn)();
        let mut map = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(reporter_id.to_string(), now);
    }

    /// Number of reporters seen within the window, recomputed on every call
    pub fn active_count(&self) -> usize {
        let now = (self.now_fn)();
        let map = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|&&seen| now - seen <= self.window_secs).count()
    }

    pub fn is_active(&self, reporter_id: &str) -> bool {
        let now = (self.now_fn)();
        let map = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(reporter_id)
            .map_or(false, |&seen| now - seen <= self.window_secs)
    }

    /// Drop reporters whose last sighting is older than the window
    ///
    /// Returns the number of evicted entries.
    pub fn evict_stale(&self) -> usize {
        let now = (self.now_fn)();
        let mut map = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, seen| now - *seen <= self.window_secs);
        before - map.len()
    }

    /// Tracked entries, stale ones included
    pub fn len(&self) -> usize {
        self.last_seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn manual_clock(start: i64) -> (Arc<AtomicI64>, Clock) {
        let now = Arc::new(AtomicI64::new(start));
        let handle = now.clone();
        (now, Arc::new(move || handle.load(Ordering::SeqCst)))
    }

    #[test]
    fn test_window_boundaries() {
        let (now, clock) = manual_clock(1_700_000_000);
        let tracker = PresenceTracker::new_with_clock(60, clock);

        tracker.touch("player-1");

        now.store(1_700_000_000 + 59, Ordering::SeqCst);
        assert_eq!(tracker.active_count(), 1);

        // Exactly `window` seconds later still counts as active
        now.store(1_700_000_000 + 60, Ordering::SeqCst);
        assert_eq!(tracker.active_count(), 1);
        assert!(tracker.is_active("player-1"));

        now.store(1_700_000_000 + 61, Ordering::SeqCst);
        assert_eq!(tracker.active_count(), 0);
        assert!(!tracker.is_active("player-1"));
    }

    #[test]
    fn test_touch_overwrites_last_seen() {
        let (now, clock) = manual_clock(1_000);
        let tracker = PresenceTracker::new_with_clock(10, clock);

        tracker.touch("a");
        now.store(1_008, Ordering::SeqCst);
        tracker.touch("a");
        now.store(1_015, Ordering::SeqCst);

        assert_eq!(tracker.active_count(), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_evict_stale_is_lazy() {
        let (now, clock) = manual_clock(1_000);
        let tracker = PresenceTracker::new_with_clock(10, clock);

        tracker.touch("old");
        now.store(1_020, Ordering::SeqCst);
        tracker.touch("fresh");

        // Stale entry still tracked until eviction runs
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.active_count(), 1);

        assert_eq!(tracker.evict_stale(), 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_active("fresh"));
    }

    #[test]
    fn test_concurrent_touch_and_evict() {
        let tracker = Arc::new(PresenceTracker::new(60));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        tracker.touch(&format!("reporter-{}-{}", t, i));
                        if i % 10 == 0 {
                            tracker.evict_stale();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(tracker.active_count(), 800);
    }
}
