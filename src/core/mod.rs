//! # Core Module
//!
//! The GUI-agnostic thumbnail cache engine.
//!
//! ## Modules
//! - `store` - Durable key-value storage for thumbnails
//! - `registry` - Entry bookkeeping (sizes, timestamps, access counts)
//! - `eviction` - Frees space before inserts that would exceed capacity
//! - `generator` - Decodes, downsizes and JPEG-encodes source images
//! - `handle` - Ephemeral references handed to renderers
//! - `service` - The public cache facade

pub mod clock;
pub mod config;
pub mod eviction;
pub mod generator;
pub mod handle;
pub mod key;
pub mod registry;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::CacheConfig;
pub use generator::{ImageSource, JpegThumbnailer, ThumbnailGenerator};
pub use handle::{HandleTable, ThumbnailHandle};
pub use key::CacheKey;
pub use service::{ThumbnailCache, ThumbnailCacheBuilder};
pub use store::{
    Admission, AdmissionResult, CacheEntry, EntryMetadata, InMemoryStore, SqliteStore,
    ThumbnailStore,
};
