use std::collections::VecDeque;

/// Append-only history with batch eviction.
///
/// When an append finds the buffer at capacity, the oldest `ceil(C/2)` entries
/// are dropped in one step and only the newest `floor(C/2)` survive. The new
/// entry goes in after that. This is not an LRU: between evictions the oldest
/// entries stay untouched.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Creates an empty history. A capacity below 1 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() >= self.capacity {
            let keep = self.capacity / 2;
            let evict = self.entries.len() - keep;
            self.entries.drain(..evict);
        }
        self.entries.push_back(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

impl<T: Clone> BoundedHistory<T> {
    /// Copies the entries out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
