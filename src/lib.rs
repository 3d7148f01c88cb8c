//! # Album Thumbnail Cache
//!
//! Thumbnail cache for a photo album organizer.
//!
//! ## Core Behavior
//! - **Bounded** - a soft byte capacity, enforced by evicting before inserts
//! - **Frequency-aware** - least frequently used entries go first, oldest
//!   first among equals
//! - **Available** - storage trouble degrades the cache, it never takes the
//!   application down
//!
//! ## Architecture
//! - `core` - The cache engine (store, registry, eviction, generator, facade)
//! - `events` - Diagnostic event channel
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, ThumbnailCacheError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global tracing subscriber already set");
    }
}
