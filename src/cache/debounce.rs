//! Debounce Cache — suppresses re-processing of a credential at a gate
//! within a short window, mirroring the `(gate_id, credential_value)` ->
//! timestamp dict `parking_service.py` keeps to drop scanner chatter.
//!
//! Built the way `sessions/mod.rs`'s `SessionStore` holds live state: a
//! `DashMap` behind a plain struct, no background sweeper — stale entries
//! are reaped opportunistically on insert.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct DebounceCache {
    seen: DashMap<(i64, String), Instant>,
    window: Duration,
}

impl DebounceCache {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            window,
        }
    }

    /// Returns `true` if `(gate_id, credential_value)` was already seen
    /// within the debounce window, and records this occurrence either way.
    ///
    /// Uses the `entry` API rather than a separate `get` + `insert` so the
    /// read-then-update happens under a single per-key lock; two scans
    /// racing on the same key otherwise could both observe it absent and
    /// both pass the debounce check.
    pub fn check_and_record(&self, gate_id: i64, credential_value: &str) -> bool {
        let key = (gate_id, credential_value.to_string());
        let now = Instant::now();

        let is_duplicate = match self.seen.entry(key) {
            Entry::Occupied(mut entry) => {
                let duplicate = now.duration_since(*entry.get()) < self.window;
                entry.insert(now);
                duplicate
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                false
            }
        };

        if self.seen.len() > 4096 {
            self.purge_expired(now);
        }

        is_duplicate
    }

    fn purge_expired(&self, now: Instant) {
        self.seen
            .retain(|_, last| now.duration_since(*last) < self.window);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_scan_is_never_a_duplicate() {
        let cache = DebounceCache::new(Duration::from_secs(20));
        assert!(!cache.check_and_record(1, "E2801199"));
    }

    #[test]
    fn second_scan_within_window_is_a_duplicate() {
        let cache = DebounceCache::new(Duration::from_secs(20));
        assert!(!cache.check_and_record(1, "E2801199"));
        assert!(cache.check_and_record(1, "E2801199"));
    }

    #[test]
    fn different_gates_do_not_share_debounce_state() {
        let cache = DebounceCache::new(Duration::from_secs(20));
        assert!(!cache.check_and_record(1, "E2801199"));
        assert!(!cache.check_and_record(2, "E2801199"));
    }

    #[test]
    fn scan_outside_window_is_not_a_duplicate() {
        let cache = DebounceCache::new(Duration::from_millis(10));
        assert!(!cache.check_and_record(1, "E2801199"));
        std::thread::sleep(Duration::from_millis(25));
        assert!(!cache.check_and_record(1, "E2801199"));
    }

    #[test]
    fn concurrent_first_scans_on_the_same_key_yield_exactly_one_non_duplicate() {
        use std::sync::Arc;

        let cache = Arc::new(DebounceCache::new(Duration::from_secs(20)));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.check_and_record(1, "E2801199"))
            })
            .collect();

        let non_duplicates = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&is_duplicate| !is_duplicate)
            .count();

        assert_eq!(non_duplicates, 1, "only the first racing scan may pass the debounce gate");
    }
}
