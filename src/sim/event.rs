//! Bounded event log
//!
//! Discrete occurrences (ability used, token collected, collision...) are
//! appended here for audio/HUD consumers. Ids start at 1 and strictly
//! increase; once `capacity` is exceeded the oldest entries are dropped.
//! Consumers remember the last id they saw and ask for everything newer.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One entry in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent<K> {
    pub id: u64,
    /// Simulation time (seconds) when the event fired
    pub at: f32,
    pub kind: K,
}

/// Append-only ring of events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog<K> {
    entries: VecDeque<LoggedEvent<K>>,
    capacity: usize,
    next_id: u64,
}

impl<K> EventLog<K> {
    /// Create an empty log. A capacity of 0 is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append an event and return its id
    pub fn push(&mut self, at: f32, kind: K) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(LoggedEvent { id, at, kind });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        id
    }

    /// Events newer than `last_seen_id`, oldest first
    pub fn since(&self, last_seen_id: u64) -> impl Iterator<Item = &LoggedEvent<K>> {
        self.entries.iter().filter(move |e| e.id > last_seen_id)
    }

    /// All retained events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent<K>> {
        self.entries.iter()
    }

    /// Id of the newest event ever pushed (0 if none)
    pub fn last_id(&self) -> u64 {
        self.next_id - 1
    }

    pub fn latest(&self) -> Option<&LoggedEvent<K>> {
        self.entries.back()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
