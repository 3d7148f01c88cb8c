//! # Events Module
//!
//! Diagnostic events emitted by the thumbnail cache.
//!
//! ## Design
//! The cache never fails loudly when its store misbehaves. Instead it logs
//! and emits a [`CacheEvent::Degraded`] through a channel, so any UI or
//! test can observe hits, misses, evictions and fallbacks.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//! let cache = ThumbnailCache::builder().store(store).events(sender).build()?;
//!
//! cache.get_thumbnail(source, "/photos/a.jpg").await?;
//! for event in receiver.drain() {
//!     println!("{:?}", event);
//! }
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
