//! # Store Module
//!
//! Persists generated thumbnails so they survive restarts.
//!
//! ## Backends
//! - `SqliteStore` - Persistent storage using SQLite
//! - `InMemoryStore` - For testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::ThumbnailStore;

use serde::{Deserialize, Serialize};

/// A stored thumbnail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Cache key (file path or synthetic identifier)
    pub key: String,
    /// Encoded thumbnail bytes
    pub image_bytes: Vec<u8>,
    /// Length of `image_bytes`
    pub size_bytes: u64,
    /// Creation or last access time, milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Number of times the entry was created or served
    pub access_count: u64,
}

impl CacheEntry {
    /// Build a fresh entry as stored on a cache miss
    pub fn new(key: impl Into<String>, image_bytes: Vec<u8>, now_millis: u64) -> Self {
        let size_bytes = image_bytes.len() as u64;
        Self {
            key: key.into(),
            image_bytes,
            size_bytes,
            timestamp: now_millis,
            access_count: 1,
        }
    }

    /// Metadata view without the payload
    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata {
            key: self.key.clone(),
            size_bytes: self.size_bytes,
            timestamp: self.timestamp,
            access_count: self.access_count,
        }
    }
}

/// Entry bookkeeping used for eviction decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub key: String,
    pub size_bytes: u64,
    pub timestamp: u64,
    pub access_count: u64,
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Total size of cached thumbnails in bytes
    pub total_size_bytes: u64,
    /// Oldest entry timestamp
    pub oldest_entry: Option<u64>,
    /// Newest entry timestamp
    pub newest_entry: Option<u64>,
}

/// How an entry is to be admitted, decided while the store holds its
/// write transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Keys to remove before inserting
    pub evict: Vec<String>,
    /// Whether the entry is inserted at all
    pub admit: bool,
}

impl Admission {
    pub fn store(evict: Vec<String>) -> Self {
        Self { evict, admit: true }
    }

    pub fn reject() -> Self {
        Self::default()
    }
}

/// What a bounded put actually did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionResult {
    /// Bytes held by every entry other than the one being written, before
    /// anything was evicted
    pub previous_total: u64,
    /// Entries removed to make room
    pub evicted: Vec<EntryMetadata>,
    /// Metadata of the written entry, `None` if it was rejected
    pub stored: Option<EntryMetadata>,
}

impl StoreStats {
    pub fn from_metadata(entries: &[EntryMetadata]) -> Self {
        Self {
            total_entries: entries.len(),
            total_size_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            oldest_entry: entries.iter().map(|e| e.timestamp).min(),
            newest_entry: entries.iter().map(|e| e.timestamp).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_starts_with_one_access() {
        let entry = CacheEntry::new("/photos/a.jpg", vec![1, 2, 3], 42);

        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.size_bytes, 3);
        assert_eq!(entry.timestamp, 42);
    }

    #[test]
    fn metadata_drops_payload_only() {
        let entry = CacheEntry::new("k", vec![0; 10], 7);
        let meta = entry.metadata();

        assert_eq!(meta.key, "k");
        assert_eq!(meta.size_bytes, 10);
        assert_eq!(meta.timestamp, 7);
        assert_eq!(meta.access_count, 1);
    }

    #[test]
    fn stats_from_empty_metadata() {
        let stats = StoreStats::from_metadata(&[]);
        assert_eq!(stats, StoreStats::default());
    }

    #[test]
    fn stats_track_oldest_and_newest() {
        let entries = vec![
            CacheEntry::new("a", vec![0; 5], 300).metadata(),
            CacheEntry::new("b", vec![0; 7], 100).metadata(),
        ];
        let stats = StoreStats::from_metadata(&entries);

        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_size_bytes, 12);
        assert_eq!(stats.oldest_entry, Some(100));
        assert_eq!(stats.newest_entry, Some(300));
    }
}
