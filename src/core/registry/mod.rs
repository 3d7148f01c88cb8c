//! # Registry Module
//!
//! Entry bookkeeping on top of a [`ThumbnailStore`]: stamps entries with
//! the clock, maintains access counts and answers the size questions the
//! eviction engine asks.

use crate::core::clock::{Clock, SystemClock};
use crate::core::store::{
    Admission, AdmissionResult, CacheEntry, EntryMetadata, StoreStats, ThumbnailStore,
};
use crate::error::StoreError;
use std::sync::Arc;

/// Cheap-to-clone handle over a shared store and clock
#[derive(Clone)]
pub struct CacheRegistry {
    store: Arc<dyn ThumbnailStore>,
    clock: Arc<dyn Clock>,
}

impl CacheRegistry {
    /// Registry using the system clock
    pub fn new(store: Arc<dyn ThumbnailStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn ThumbnailStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Point read; does not count as an access
    pub fn lookup(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        self.store.get(key)
    }

    /// Count a hit. Absent keys are ignored, since a concurrent delete
    /// or eviction may have removed the entry after it was read.
    pub fn record_hit(&self, key: &str) -> Result<Option<EntryMetadata>, StoreError> {
        self.store.touch(key, self.clock.now_millis())
    }

    /// Insert or overwrite an entry with a fresh access count
    pub fn put(&self, key: &str, image_bytes: Vec<u8>) -> Result<EntryMetadata, StoreError> {
        let entry = CacheEntry::new(key, image_bytes, self.clock.now_millis());
        let meta = entry.metadata();
        self.store.put(entry)?;
        Ok(meta)
    }

    /// Remove an entry, returning whether one existed
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.store.delete(key)
    }

    /// Insert a fresh entry, letting `plan` pick evictions against the
    /// current contents within the same store transaction
    pub fn put_bounded(
        &self,
        key: &str,
        image_bytes: Vec<u8>,
        plan: &dyn Fn(&[EntryMetadata]) -> Admission,
    ) -> Result<AdmissionResult, StoreError> {
        let entry = CacheEntry::new(key, image_bytes, self.clock.now_millis());
        self.store.put_with_eviction(entry, plan)
    }

    pub fn total_size(&self) -> Result<u64, StoreError> {
        self.store.total_size()
    }

    /// Metadata for every entry in insertion order, payload omitted
    pub fn all_entries(&self) -> Result<Vec<EntryMetadata>, StoreError> {
        self.store.all_metadata()
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.clear()
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        self.store.stats()
    }
}
