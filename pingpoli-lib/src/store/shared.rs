use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::store::{EmbeddingStore, MemoryStore};

/// Holds the active store and swaps it out atomically.
///
/// Readers take a [`snapshot`](Self::snapshot) and keep using it for as long
/// as they like. A rebuild populates a fresh [`MemoryStore`] off to the side
/// and publishes it with [`replace`](Self::replace), so nobody ever observes a
/// half-built corpus. The lock is only held for the pointer swap.
#[derive(Debug, Default)]
pub struct SharedStore {
    current: RwLock<Arc<MemoryStore>>,
}

impl SharedStore {
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The store as of now. Later replacements do not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Publish `store` as the active one and return the previous snapshot.
    pub fn replace(&self, store: MemoryStore) -> Arc<MemoryStore> {
        let records = store.len();
        let next = Arc::new(store);
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };

        info!(records, previous = previous.len(), "swapped active store");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EmbeddingRecord;

    fn store_with(ids: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in ids {
            store
                .insert(EmbeddingRecord::new(*id, *id, vec![1.0, 0.0]))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_default_is_empty() {
        let shared = SharedStore::default();
        assert!(shared.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let shared = SharedStore::new(store_with(&["a", "b"]));
        let before = shared.snapshot();

        let previous = shared.replace(store_with(&["c"]));

        assert_eq!(before.len(), 2);
        assert_eq!(previous.len(), 2);
        assert_eq!(shared.snapshot().len(), 1);
        assert_eq!(shared.snapshot().records()[0].source_id, "c");
    }

    #[test]
    fn test_concurrent_readers_see_whole_stores() {
        let shared = Arc::new(SharedStore::new(store_with(&["a", "b", "c"])));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let len = shared.snapshot().len();
                        assert!(len == 3 || len == 5, "saw partial store of {len}");
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            shared.replace(store_with(&["1", "2", "3", "4", "5"]));
            shared.replace(store_with(&["a", "b", "c"]));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
