//! In-memory collection store.

use super::{Collection, CollectionStore, StoreResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Collection store kept in process memory.
///
/// Counts successful saves so callers can assert that failed operations
/// did not write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collection: Mutex<Collection>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(collection: Collection) -> Self {
        Self {
            collection: Mutex::new(collection),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls since construction.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CollectionStore for MemoryStore {
    fn load(&self) -> StoreResult<Collection> {
        let guard = self
            .collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        let mut guard = self
            .collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = collection.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
