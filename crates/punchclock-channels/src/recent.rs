use std::collections::{HashSet, VecDeque};

pub const DEFAULT_RECENT_CAPACITY: usize = 1024;

/// Bounded memory of recently dispatched update ids.
///
/// Guards against a batch being redelivered after a failed acknowledge.
/// The oldest id is forgotten once `capacity` is exceeded.
#[derive(Debug)]
pub struct RecentUpdates {
    order: VecDeque<i64>,
    seen: HashSet<i64>,
    capacity: usize,
}

impl RecentUpdates {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `id`. Returns `false` if it was already recorded.
    pub fn insert(&mut self, id: i64) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }

    pub fn contains(&self, id: i64) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for RecentUpdates {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_is_refused() {
        let mut r = RecentUpdates::default();
        assert!(r.insert(10));
        assert!(!r.insert(10));
        assert!(r.contains(10));
    }

    #[test]
    fn oldest_is_evicted() {
        let mut r = RecentUpdates::new(2);
        r.insert(1);
        r.insert(2);
        r.insert(3);
        assert_eq!(r.len(), 2);
        assert!(!r.contains(1));
        assert!(r.contains(2) && r.contains(3));
        // Forgotten ids are accepted again.
        assert!(r.insert(1));
    }
}
