//! Fixed-capacity window of recently served question ids.

use std::collections::HashMap;

/// Ring buffer of the last N ids with O(1) membership.
///
/// Inserting into a full window evicts the oldest id.
#[derive(Debug, Clone)]
pub struct RecentWindow {
    slots: Vec<Option<String>>,
    head: usize,
    counts: HashMap<String, usize>,
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
            counts: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.counts.contains_key(id)
    }

    pub fn push(&mut self, id: &str) {
        if self.slots.is_empty() {
            return;
        }

        if let Some(evicted) = self.slots[self.head].take() {
            if let Some(count) = self.counts.get_mut(&evicted) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&evicted);
                }
            }
        }

        self.slots[self.head] = Some(id.to_string());
        *self.counts.entry(id.to_string()).or_insert(0) += 1;
        self.head = (self.head + 1) % self.slots.len();
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.counts.clear();
        self.head = 0;
    }

    /// Ids from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let (newer, older) = self.slots.split_at(self.head);
        older
            .iter()
            .chain(newer.iter())
            .filter_map(|s| s.as_deref())
    }
}
