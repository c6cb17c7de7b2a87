//! Keyed deadline queue.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A set of keyed deadlines. Scheduling a key again replaces its deadline.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    deadlines: HashMap<K, Instant>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            deadlines: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> TimerQueue<K> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` to expire at `deadline`, returning any replaced deadline.
    pub fn schedule(&mut self, key: K, deadline: Instant) -> Option<Instant> {
        self.deadlines.insert(key, deadline)
    }

    /// Cancel a pending deadline.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    /// Check if `key` has a pending deadline.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    /// The pending deadline for `key`.
    #[must_use]
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.deadlines.get(key).copied()
    }

    /// The earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// earliest first.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<K> {
        let mut expired: Vec<(Instant, K)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        expired.sort_by_key(|(deadline, _)| *deadline);

        for (_, key) in &expired {
            self.deadlines.remove(key);
        }
        expired.into_iter().map(|(_, key)| key).collect()
    }

    /// Pending keys with their remaining time, earliest first.
    #[must_use]
    pub fn pending(&self, now: Instant) -> Vec<(K, Duration)> {
        let mut pending: Vec<(K, Instant)> = self
            .deadlines
            .iter()
            .map(|(key, deadline)| (key.clone(), *deadline))
            .collect();
        pending.sort_by_key(|(_, deadline)| *deadline);
        pending
            .into_iter()
            .map(|(key, deadline)| (key, deadline.saturating_duration_since(now)))
            .collect()
    }

    /// Drop every pending deadline.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Number of pending deadlines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
