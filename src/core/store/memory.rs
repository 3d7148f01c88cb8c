//! In-memory store backend for testing.

use super::{Admission, AdmissionResult, CacheEntry, EntryMetadata, ThumbnailStore};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory thumbnail store
///
/// Useful for testing and for sessions where persistence isn't needed.
/// Entries remember their insertion sequence so `all_metadata` is
/// ordered the same way the SQLite backend orders rows.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, (u64, CacheEntry)>,
    next_seq: u64,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("in-memory store".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::LockPoisoned("in-memory store".to_string()))
    }
}

impl Inner {
    fn insert(&mut self, entry: CacheEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(entry.key.clone(), (seq, entry));
    }

    fn ordered_metadata(&self) -> Vec<EntryMetadata> {
        let mut ordered: Vec<(u64, EntryMetadata)> = self
            .entries
            .values()
            .map(|(seq, entry)| (*seq, entry.metadata()))
            .collect();
        ordered.sort_by_key(|(seq, _)| *seq);

        ordered.into_iter().map(|(_, meta)| meta).collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let inner = self.read()?;
        Ok(inner.entries.get(key).map(|(_, entry)| entry.clone()))
    }

    fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        self.write()?.insert(entry);
        Ok(())
    }

    fn touch(&self, key: &str, now_millis: u64) -> Result<Option<EntryMetadata>, StoreError> {
        let mut inner = self.write()?;

        Ok(inner.entries.get_mut(key).map(|(_, entry)| {
            entry.access_count += 1;
            entry.timestamp = entry.timestamp.max(now_millis);
            entry.metadata()
        }))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        Ok(inner.entries.remove(key).is_some())
    }

    fn put_with_eviction(
        &self,
        entry: CacheEntry,
        plan: &dyn Fn(&[EntryMetadata]) -> Admission,
    ) -> Result<AdmissionResult, StoreError> {
        let mut inner = self.write()?;

        let others: Vec<EntryMetadata> = inner
            .ordered_metadata()
            .into_iter()
            .filter(|meta| meta.key != entry.key)
            .collect();
        let previous_total = others.iter().map(|m| m.size_bytes).sum();
        let admission = plan(&others);

        let evicted = admission
            .evict
            .iter()
            .filter(|key| **key != entry.key)
            .filter_map(|key| inner.entries.remove(key))
            .map(|(_, evicted)| evicted.metadata())
            .collect();

        let stored = admission.admit.then(|| entry.metadata());
        if admission.admit {
            inner.insert(entry);
        }

        Ok(AdmissionResult {
            previous_total,
            evicted,
            stored,
        })
    }

    fn all_metadata(&self) -> Result<Vec<EntryMetadata>, StoreError> {
        Ok(self.read()?.ordered_metadata())
    }

    fn total_size(&self) -> Result<u64, StoreError> {
        let inner = self.read()?;
        Ok(inner.entries.values().map(|(_, e)| e.size_bytes).sum())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.entries.clear();
        Ok(())
    }
}
