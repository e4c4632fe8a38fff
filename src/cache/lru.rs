//! LRU Tracker Module
//!
//! Keeps cache keys ordered by how recently they were inserted or read.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Recency order for cache keys.
///
/// Keys are stored oldest first: the front of the deque is the next eviction
/// candidate, the back is the most recently touched key.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<String>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if untracked.
    pub fn touch(&mut self, key: &str) {
        if let Some(pos) = self.position(key) {
            if pos + 1 == self.order.len() {
                return;
            }
            if let Some(existing) = self.order.remove(pos) {
                self.order.push_back(existing);
            }
        } else {
            self.order.push_back(key.to_string());
        }
    }

    // == Remove ==
    /// Stops tracking a key. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.position(key) {
            self.order.remove(pos);
        }
    }

    // == Pop Oldest ==
    /// Removes and returns the least recently touched key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    /// Iterates keys from least to most recently touched.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        // Recently touched keys sit at the back, search from there.
        self.order.iter().rposition(|k| k == key)
    }
}
