//! Backing stores for rate-limit windows.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;

/// Store-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store cannot be reached or is in a broken state.
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot of a key's window after a [`RateLimitStore::hit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Whether this attempt was recorded (i.e. it fit under the limit).
    pub recorded: bool,
    /// Attempts inside the window, including this one when recorded.
    pub count: u32,
    /// Oldest attempt still inside the window, in epoch milliseconds.
    pub oldest_ms: Option<i64>,
}

/// Storage contract for sliding-window counters.
///
/// Implementations must make [`hit`](RateLimitStore::hit) atomic per key: the
/// prune, the limit check and the insert happen as one step.
pub trait RateLimitStore: Send + Sync + Debug {
    /// Drop expired attempts for `key`, then record one at `now_ms` if fewer
    /// than `max_attempts` remain inside the window.
    fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        max_attempts: u32,
    ) -> Result<WindowState, StoreError>;

    /// Number of attempts for `key` inside the window ending at `now_ms`.
    fn count(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<u32, StoreError>;

    /// Remove attempts at or before `cutoff_ms` and forget empty keys.
    ///
    /// Returns the number of keys removed.
    fn purge(&self, cutoff_ms: i64) -> Result<usize, StoreError>;
}

type Attempts = Arc<Mutex<Vec<i64>>>;

/// In-process store with one lock per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: RwLock<HashMap<String, Attempts>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn attempts(&self, key: &str) -> Result<Attempts, StoreError> {
        {
            let keys = self.keys.read().map_err(poisoned)?;
            if let Some(attempts) = keys.get(key) {
                return Ok(attempts.clone());
            }
        }

        let mut keys = self.keys.write().map_err(poisoned)?;

        // Another request may have inserted the key between the two locks
        Ok(keys
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone())
    }
}

impl RateLimitStore for MemoryStore {
    fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        max_attempts: u32,
    ) -> Result<WindowState, StoreError> {
        let attempts = self.attempts(key)?;
        let mut attempts = attempts.lock().map_err(poisoned)?;

        let cutoff = now_ms.saturating_sub(window_ms);
        attempts.retain(|&t| t > cutoff);

        let recorded = attempts.len() < max_attempts as usize;
        if recorded {
            attempts.push(now_ms);
        }

        Ok(WindowState {
            recorded,
            count: attempts.len() as u32,
            oldest_ms: attempts.iter().min().copied(),
        })
    }

    fn count(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<u32, StoreError> {
        let attempts = {
            let keys = self.keys.read().map_err(poisoned)?;
            match keys.get(key) {
                Some(attempts) => attempts.clone(),
                None => return Ok(0),
            }
        };

        let attempts = attempts.lock().map_err(poisoned)?;
        let cutoff = now_ms.saturating_sub(window_ms);
        Ok(attempts.iter().filter(|&&t| t > cutoff).count() as u32)
    }

    fn purge(&self, cutoff_ms: i64) -> Result<usize, StoreError> {
        let mut keys = self.keys.write().map_err(poisoned)?;
        let before = keys.len();

        keys.retain(|_, attempts| {
            // A handle outside the map means a hit or count is in flight on
            // this key; removing it would orphan whatever that call records.
            let in_flight = Arc::strong_count(attempts) > 1;

            match attempts.lock() {
                Ok(mut attempts) => {
                    attempts.retain(|&t| t > cutoff_ms);
                    in_flight || !attempts.is_empty()
                }
                // Poisoned entries start over once nobody holds them
                Err(_) => in_flight,
            }
        });

        Ok(before - keys.len())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_records_until_limit() {
        let store = MemoryStore::new();

        let first = store.hit("login:1.2.3.4", 1_000, 60_000, 2).unwrap();
        assert!(first.recorded);
        assert_eq!(first.count, 1);
        assert_eq!(first.oldest_ms, Some(1_000));

        let second = store.hit("login:1.2.3.4", 2_000, 60_000, 2).unwrap();
        assert!(second.recorded);
        assert_eq!(second.count, 2);

        let third = store.hit("login:1.2.3.4", 3_000, 60_000, 2).unwrap();
        assert!(!third.recorded);
        assert_eq!(third.count, 2);
        assert_eq!(third.oldest_ms, Some(1_000));
    }

    #[test]
    fn test_hit_prunes_expired() {
        let store = MemoryStore::new();

        store.hit("k", 0, 1_000, 1).unwrap();
        assert!(!store.hit("k", 999, 1_000, 1).unwrap().recorded);

        let state = store.hit("k", 1_000, 1_000, 1).unwrap();
        assert!(state.recorded);
        assert_eq!(state.count, 1);
        assert_eq!(state.oldest_ms, Some(1_000));
    }

    #[test]
    fn test_count() {
        let store = MemoryStore::new();
        assert_eq!(store.count("missing", 0, 1_000).unwrap(), 0);

        store.hit("k", 0, 1_000, 10).unwrap();
        store.hit("k", 500, 1_000, 10).unwrap();
        assert_eq!(store.count("k", 600, 1_000).unwrap(), 2);
        assert_eq!(store.count("k", 1_200, 1_000).unwrap(), 1);
    }

    #[test]
    fn test_purge_removes_stale_keys() {
        let store = MemoryStore::new();
        store.hit("old", 0, 1_000, 10).unwrap();
        store.hit("new", 5_000, 1_000, 10).unwrap();
        assert_eq!(store.len(), 2);

        let removed = store.purge(4_000).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.count("new", 5_000, 1_000).unwrap(), 1);
    }

    #[test]
    fn test_purge_keeps_key_held_by_hit() {
        let store = MemoryStore::new();
        store.hit("k", 0, 1_000, 5).unwrap();

        let held = store.attempts("k").unwrap();
        assert_eq!(store.purge(50).unwrap(), 0);
        assert_eq!(store.len(), 1);
        assert!(Arc::ptr_eq(&held, &store.attempts("k").unwrap()));

        drop(held);
        assert_eq!(store.purge(50).unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_hit_and_purge_keep_every_recorded_attempt() {
        for _ in 0..2_000 {
            let store = Arc::new(MemoryStore::new());
            store.hit("k", 0, 1_000, 5).unwrap();

            let purger = {
                let store = store.clone();
                std::thread::spawn(move || store.purge(50).unwrap())
            };
            let state = store.hit("k", 100, 1_000, 5).unwrap();
            purger.join().unwrap();

            assert!(state.recorded);
            assert_eq!(store.count("k", 100, 1_000).unwrap(), 1);
        }
    }

    #[test]
    fn test_concurrent_hits_never_exceed_limit() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|n| {
                            if n % 10 == 0 {
                                store.purge(0).unwrap();
                            }
                            store.hit("k", 1_000 + i, 60_000, 20).unwrap().recorded
                        })
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 20);
        assert_eq!(store.count("k", 2_000, 60_000).unwrap(), 20);
    }

    #[test]
    fn test_extreme_window_does_not_overflow() {
        let store = MemoryStore::new();
        let state = store.hit("k", -5, i64::MAX, 1).unwrap();
        assert!(state.recorded);
        assert_eq!(store.count("k", -5, i64::MAX).unwrap(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = MemoryStore::new();
        assert!(store.hit("login:a", 0, 1_000, 1).unwrap().recorded);
        assert!(store.hit("login:b", 0, 1_000, 1).unwrap().recorded);
        assert!(store.hit("api:a", 0, 1_000, 1).unwrap().recorded);
    }
}
