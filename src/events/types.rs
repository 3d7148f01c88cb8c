//! Event type definitions for cache diagnostics.

use serde::{Deserialize, Serialize};

/// All events emitted by the thumbnail cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Cache lookups, inserts and removals
    Cache(CacheEvent),
}

/// Events describing what the cache did for a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CacheEvent {
    /// A stored thumbnail was served
    Hit { key: String, access_count: u64 },
    /// No stored thumbnail for the key
    Miss { key: String },
    /// A thumbnail was generated from a source image
    Generated { key: String, size_bytes: u64 },
    /// A generated thumbnail was persisted
    Stored { key: String, size_bytes: u64 },
    /// An entry was removed to make room
    Evicted { key: String, size_bytes: u64 },
    /// Eviction ran out of candidates before freeing enough space
    EvictionShortfall {
        required_bytes: u64,
        freed_bytes: u64,
    },
    /// An entry was removed on request
    Deleted { key: String },
    /// Every entry was removed
    Cleared,
    /// The store failed and the cache fell back to pass-through behavior
    Degraded { operation: String, message: String },
}
