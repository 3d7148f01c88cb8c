//! Thumbnail store trait definition.

use super::{Admission, AdmissionResult, CacheEntry, EntryMetadata, StoreStats};
use crate::error::StoreError;

/// Durable key-value storage for thumbnails.
///
/// Every method is one transaction: readers never see a half-applied
/// write. Implementations serialize access internally, so a single store
/// can be shared by any number of cache facades through an `Arc`.
pub trait ThumbnailStore: Send + Sync {
    /// Point read of an entry including its payload
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or overwrite an entry
    fn put(&self, entry: CacheEntry) -> Result<(), StoreError>;

    /// Bump the access count and move the timestamp to `max(current, now)`.
    ///
    /// Returns the updated metadata, or `None` if the key is absent.
    fn touch(&self, key: &str, now_millis: u64) -> Result<Option<EntryMetadata>, StoreError>;

    /// Remove one entry, returning whether it existed
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Evict and insert in a single transaction.
    ///
    /// `plan` receives the metadata of every entry except `entry.key`, in
    /// insertion order, and decides what to evict and whether to insert.
    /// No other write can land between the plan and its execution.
    fn put_with_eviction(
        &self,
        entry: CacheEntry,
        plan: &dyn Fn(&[EntryMetadata]) -> Admission,
    ) -> Result<AdmissionResult, StoreError>;

    /// Metadata of every entry, in insertion order
    fn all_metadata(&self) -> Result<Vec<EntryMetadata>, StoreError>;

    /// Sum of `size_bytes` over all entries
    fn total_size(&self) -> Result<u64, StoreError> {
        Ok(self.all_metadata()?.iter().map(|m| m.size_bytes).sum())
    }

    /// Remove every entry
    fn clear(&self) -> Result<(), StoreError>;

    /// Aggregate statistics
    fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats::from_metadata(&self.all_metadata()?))
    }
}
