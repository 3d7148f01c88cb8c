//! # Error Module
//!
//! Error types for the thumbnail cache.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - keys, paths, what went wrong
//! - **Degrade, don't crash** - store failures are absorbed by the cache facade,
//!   only generation failures reach the caller

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ThumbnailCacheError {
    #[error("Thumbnail generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Thumbnail store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while turning a source image into a thumbnail
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to decode image: {reason}")]
    DecodeError { reason: String },

    #[error("Image is empty or has zero dimensions")]
    EmptyImage,

    #[error("Resize failed: {0}")]
    ResizeFailed(String),

    #[error("JPEG encoding failed: {0}")]
    EncodeFailed(String),

    #[error("Failed to read source image {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generation task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised by a persistent thumbnail store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open thumbnail store at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Thumbnail store corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Lock on the {0} was poisoned by a panicking writer")]
    LockPoisoned(String),

    #[error("Store task failed: {0}")]
    TaskFailed(String),
}

/// Errors surfaced by the cache facade itself
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Thumbnail for {key} ({size_bytes} bytes) exceeds the cache capacity of {max_cache_size} bytes")]
    CapacityExceeded {
        key: String,
        size_bytes: u64,
        max_cache_size: u64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ThumbnailCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_open_error_includes_path() {
        let error = StoreError::OpenFailed {
            path: PathBuf::from("/cache/thumbnails.db"),
            reason: "permission denied".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/cache/thumbnails.db"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn capacity_error_names_the_key() {
        let error = CacheError::CapacityExceeded {
            key: "album-3-first".to_string(),
            size_bytes: 2048,
            max_cache_size: 512,
        };
        let message = error.to_string();
        assert!(message.contains("album-3-first"));
        assert!(message.contains("512"));
    }

    #[test]
    fn corrupted_store_suggests_recovery() {
        let error = StoreError::Corrupted {
            path: PathBuf::from("/cache/thumbnails.db"),
        };
        assert!(error.to_string().contains("Delete this file"));
    }

    #[test]
    fn generate_error_converts_to_top_level() {
        let error: ThumbnailCacheError = GenerateError::EmptyImage.into();
        assert!(matches!(error, ThumbnailCacheError::Generate(_)));
    }
}
