// src/worklist/dedup.rs
// =============================================================================
// The deduplicator: an append-only set of every item admitted during a run.
//
// try_admit() is the only way in. It checks membership and inserts in a
// single lock scope, so two callers racing on the same item can never both
// win. Items are never removed.
//
// Rust concepts:
// - Mutex: one caller at a time inside the critical section
// - HashSet::insert returns false when the value was already present, which
//   gives us check-and-insert as one call
// =============================================================================

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

/// Admits each distinct item exactly once for the lifetime of the set.
#[derive(Debug)]
pub struct Deduplicator<T> {
    seen: Mutex<HashSet<T>>,
}

impl<T: Eq + Hash + Clone> Deduplicator<T> {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Returns true for the first caller to present `item`, false for every
    /// later call with an equal item.
    pub fn try_admit(&self, item: &T) -> bool {
        let mut seen = self.lock();
        if seen.contains(item) {
            return false;
        }
        seen.insert(item.clone())
    }

    pub fn contains(&self, item: &T) -> bool {
        self.lock().contains(item)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // No code panics while holding the lock, but if a poisoned set ever shows
    // up its contents are still valid: inserts are all-or-nothing.
    fn lock(&self) -> MutexGuard<'_, HashSet<T>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Eq + Hash + Clone> Default for Deduplicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_admits_once() {
        let dedup = Deduplicator::new();
        assert!(dedup.is_empty());

        assert!(dedup.try_admit(&"a".to_string()));
        assert!(!dedup.try_admit(&"a".to_string()));
        assert!(dedup.try_admit(&"b".to_string()));

        assert_eq!(dedup.len(), 2);
        assert!(dedup.contains(&"a".to_string()));
        assert!(!dedup.contains(&"c".to_string()));
    }

    #[test]
    fn test_concurrent_admit_has_single_winner() {
        let dedup = Arc::new(Deduplicator::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dedup = dedup.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        if dedup.try_admit(&i) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // 100 distinct items, each admitted by exactly one of 16 threads
        assert_eq!(winners.load(Ordering::SeqCst), 100);
        assert_eq!(dedup.len(), 100);
    }
}
