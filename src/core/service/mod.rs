//! # Service Module
//!
//! The public thumbnail cache facade.
//!
//! ## Flow
//! - **Hit**: look the key up, count the access, hand out a handle to the
//!   stored bytes
//! - **Miss**: generate from the source image, evict if the insert would
//!   exceed capacity, store, hand out a handle
//!
//! Store I/O and image work run on tokio's blocking pool; those awaits are
//! the only suspension points. Work already handed to the pool runs to
//! completion even if the caller stops waiting.
//!
//! ## Failure policy
//! Only generation failures (and, with `strict_capacity`, inserts that
//! cannot be made to fit) reach the caller. A store that fails to open
//! turns the cache into a pass-through; a store that fails mid-operation
//! is logged and reported as [`CacheEvent::Degraded`], and the operation
//! answers as if the cache were empty. When persisting a freshly
//! generated thumbnail fails, the caller still gets a handle to the
//! unpersisted bytes.
//!
//! Concurrent misses for the same key are not coalesced: each generates
//! and the last write wins.

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::CacheConfig;
use crate::core::eviction::{
    CapacityLimits, EvictionOutcome, EvictionPolicy, Evictor, InsertReport, LfuLruPolicy,
};
use crate::core::generator::{ImageSource, JpegThumbnailer, ThumbnailGenerator};
use crate::core::handle::{HandleTable, ThumbnailHandle};
use crate::core::registry::CacheRegistry;
use crate::core::store::{EntryMetadata, InMemoryStore, SqliteStore, StoreStats, ThumbnailStore};
use crate::error::{CacheError, GenerateError, Result, StoreError, ThumbnailCacheError};
use crate::events::{null_sender, CacheEvent, EventSender};
use std::path::PathBuf;
use std::sync::Arc;

enum StoreChoice {
    Default,
    Ready(Arc<dyn ThumbnailStore>),
    Sqlite(PathBuf),
    Unavailable,
}

/// Builder for [`ThumbnailCache`]
pub struct ThumbnailCacheBuilder {
    config: CacheConfig,
    store: StoreChoice,
    generator: Option<Arc<dyn ThumbnailGenerator>>,
    policy: Option<Arc<dyn EvictionPolicy>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<EventSender>,
    handles: Option<Arc<HandleTable>>,
}

impl ThumbnailCacheBuilder {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            store: StoreChoice::Default,
            generator: None,
            policy: None,
            clock: None,
            events: None,
            handles: None,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an already opened store, possibly shared with other caches
    pub fn store(mut self, store: Arc<dyn ThumbnailStore>) -> Self {
        self.store = StoreChoice::Ready(store);
        self
    }

    /// Open a SQLite store at build time. If opening fails the cache is
    /// built in pass-through mode instead of failing.
    pub fn sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = StoreChoice::Sqlite(path.into());
        self
    }

    /// Build without any store: every lookup misses, nothing is kept
    pub fn without_store(mut self) -> Self {
        self.store = StoreChoice::Unavailable;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn ThumbnailGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn eviction_policy(mut self, policy: Arc<dyn EvictionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Share a handle table between several caches
    pub fn handles(mut self, handles: Arc<HandleTable>) -> Self {
        self.handles = Some(handles);
        self
    }

    /// Validate the configuration and assemble the cache
    pub fn build(self) -> std::result::Result<ThumbnailCache, CacheError> {
        self.config.validate()?;

        let events = self.events.unwrap_or_else(null_sender);

        let store: Option<Arc<dyn ThumbnailStore>> = match self.store {
            StoreChoice::Default => Some(Arc::new(InMemoryStore::new())),
            StoreChoice::Ready(store) => Some(store),
            StoreChoice::Unavailable => None,
            StoreChoice::Sqlite(path) => match SqliteStore::open(&path) {
                Ok(store) => {
                    tracing::info!("Thumbnail cache opened at {}", path.display());
                    Some(Arc::new(store))
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize thumbnail cache: {}", e);
                    events.cache(CacheEvent::Degraded {
                        operation: "open".to_string(),
                        message: e.to_string(),
                    });
                    None
                }
            },
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let registry = store.map(|store| CacheRegistry::with_clock(store, clock));

        Ok(ThumbnailCache {
            config: self.config,
            registry,
            evictor: Evictor::new(self.policy.unwrap_or_else(|| Arc::new(LfuLruPolicy))),
            generator: self.generator.unwrap_or_else(|| Arc::new(JpegThumbnailer::new())),
            events,
            handles: self.handles.unwrap_or_default(),
        })
    }
}

impl Default for ThumbnailCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity-bounded, persistent thumbnail cache
pub struct ThumbnailCache {
    config: CacheConfig,
    registry: Option<CacheRegistry>,
    evictor: Evictor,
    generator: Arc<dyn ThumbnailGenerator>,
    events: EventSender,
    handles: Arc<HandleTable>,
}

impl ThumbnailCache {
    pub fn builder() -> ThumbnailCacheBuilder {
        ThumbnailCacheBuilder::new()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// False when the store could not be opened and the cache is a pass-through
    pub fn is_persistent(&self) -> bool {
        self.registry.is_some()
    }

    /// Handle table backing every handle this cache returns
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Release a handle that is no longer displayed
    pub fn release(&self, handle: &ThumbnailHandle) -> bool {
        self.handles.revoke(handle.url())
    }

    /// Return the cached thumbnail for `key`, generating and storing one
    /// from `source` on a miss.
    pub async fn get_thumbnail(
        &self,
        source: impl Into<ImageSource>,
        key: &str,
    ) -> Result<ThumbnailHandle> {
        if let Some(handle) = self.get_cached_thumbnail(key).await {
            return Ok(handle);
        }

        let bytes = self.generate(source.into()).await?;
        let size_bytes = bytes.len() as u64;
        tracing::debug!("Generated thumbnail for {} ({} bytes)", key, size_bytes);
        self.events.cache(CacheEvent::Generated {
            key: key.to_string(),
            size_bytes,
        });

        match self.insert(key, bytes.clone()).await {
            Ok(Some(report)) => self.finish_insert(key, size_bytes, report)?,
            Ok(None) => {}
            Err(e) => self.degrade("store", &e),
        }

        Ok(self.handles.create(bytes))
    }

    /// Look up a stored thumbnail without generating one
    pub async fn get_cached_thumbnail(&self, key: &str) -> Option<ThumbnailHandle> {
        let owned_key = key.to_string();
        let result = self
            .with_registry(move |registry| {
                let Some(entry) = registry.lookup(&owned_key)? else {
                    return Ok(None);
                };
                let touched = registry.record_hit(&owned_key)?;
                let access_count = touched
                    .map(|meta| meta.access_count)
                    .unwrap_or(entry.access_count + 1);
                Ok(Some((entry.image_bytes, access_count)))
            })
            .await;

        match result {
            Ok(Some(Some((bytes, access_count)))) => {
                tracing::debug!("Thumbnail cache hit for {} (access #{})", key, access_count);
                self.events.cache(CacheEvent::Hit {
                    key: key.to_string(),
                    access_count,
                });
                Some(self.handles.create(bytes))
            }
            Ok(_) => {
                tracing::debug!("Thumbnail cache miss for {}", key);
                self.events.cache(CacheEvent::Miss {
                    key: key.to_string(),
                });
                None
            }
            Err(e) => {
                self.degrade("lookup", &e);
                None
            }
        }
    }

    /// Cache-or-generate with an optional source.
    ///
    /// Without a source only the cache is consulted, which is how views
    /// render photos whose original file is no longer at hand.
    pub async fn load_thumbnail(
        &self,
        source: Option<ImageSource>,
        key: &str,
    ) -> Result<Option<ThumbnailHandle>> {
        match source {
            Some(source) => self.get_thumbnail(source, key).await.map(Some),
            None => Ok(self.get_cached_thumbnail(key).await),
        }
    }

    /// Remove a stored thumbnail; `false` if there was nothing to remove
    pub async fn delete_cached_thumbnail(&self, key: &str) -> bool {
        let owned_key = key.to_string();
        match self
            .with_registry(move |registry| registry.remove(&owned_key))
            .await
        {
            Ok(Some(true)) => {
                tracing::debug!("Deleted cached thumbnail: {}", key);
                self.events.cache(CacheEvent::Deleted {
                    key: key.to_string(),
                });
                true
            }
            Ok(_) => false,
            Err(e) => {
                self.degrade("delete", &e);
                false
            }
        }
    }

    /// Total bytes currently stored
    pub async fn get_cache_size(&self) -> u64 {
        match self.with_registry(|registry| registry.total_size()).await {
            Ok(size) => size.unwrap_or(0),
            Err(e) => {
                self.degrade("size", &e);
                0
            }
        }
    }

    /// Remove every stored thumbnail
    pub async fn clear_cache(&self) {
        match self.with_registry(|registry| registry.clear()).await {
            Ok(Some(())) => {
                tracing::info!("Thumbnail cache cleared");
                self.events.cache(CacheEvent::Cleared);
            }
            Ok(None) => {}
            Err(e) => self.degrade("clear", &e),
        }
    }

    pub async fn stats(&self) -> StoreStats {
        match self.with_registry(|registry| registry.stats()).await {
            Ok(stats) => stats.unwrap_or_default(),
            Err(e) => {
                self.degrade("stats", &e);
                StoreStats::default()
            }
        }
    }

    /// Bookkeeping for every stored thumbnail, oldest insert first
    pub async fn entries(&self) -> Vec<EntryMetadata> {
        match self.with_registry(|registry| registry.all_entries()).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                self.degrade("list", &e);
                Vec::new()
            }
        }
    }

    async fn generate(&self, source: ImageSource) -> std::result::Result<Vec<u8>, GenerateError> {
        let generator = Arc::clone(&self.generator);
        let target = self.config.thumbnail_size;
        let quality = self.config.quality;

        tokio::task::spawn_blocking(move || {
            let bytes = source.load()?;
            generator.generate(&bytes, target, quality)
        })
        .await
        .map_err(|e| GenerateError::TaskFailed(e.to_string()))?
    }

    /// Evict as needed and store. `Ok(None)` in pass-through mode.
    async fn insert(
        &self,
        key: &str,
        bytes: Vec<u8>,
    ) -> std::result::Result<Option<InsertReport>, StoreError> {
        let key = key.to_string();
        let evictor = self.evictor.clone();
        let limits = CapacityLimits {
            max_cache_size: self.config.max_cache_size,
            strict: self.config.strict_capacity,
        };

        self.with_registry(move |registry| evictor.insert(&registry, &key, bytes, limits))
            .await
    }

    fn finish_insert(
        &self,
        key: &str,
        size_bytes: u64,
        report: InsertReport,
    ) -> std::result::Result<(), ThumbnailCacheError> {
        if let Some(eviction) = &report.eviction {
            self.report_eviction(eviction);
        }

        match report.stored {
            Some(entry) => {
                self.events.cache(CacheEvent::Stored {
                    key: entry.key,
                    size_bytes: entry.size_bytes,
                });
                Ok(())
            }
            None => Err(CacheError::CapacityExceeded {
                key: key.to_string(),
                size_bytes,
                max_cache_size: self.config.max_cache_size,
            }
            .into()),
        }
    }

    fn report_eviction(&self, outcome: &EvictionOutcome) {
        for entry in &outcome.evicted {
            self.events.cache(CacheEvent::Evicted {
                key: entry.key.clone(),
                size_bytes: entry.size_bytes,
            });
        }

        if let Some(over) = outcome.shortfall() {
            tracing::warn!(
                "Eviction freed {} of {} bytes; cache is {} bytes over its capacity",
                outcome.freed_bytes,
                outcome.required_bytes,
                over
            );
            self.events.cache(CacheEvent::EvictionShortfall {
                required_bytes: outcome.required_bytes,
                freed_bytes: outcome.freed_bytes,
            });
        }
    }

    /// Run `op` against the registry on the blocking pool.
    ///
    /// `Ok(None)` means there is no store to run against.
    async fn with_registry<T, F>(&self, op: F) -> std::result::Result<Option<T>, StoreError>
    where
        F: FnOnce(CacheRegistry) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let Some(registry) = self.registry.clone() else {
            return Ok(None);
        };

        tokio::task::spawn_blocking(move || op(registry))
            .await
            .map_err(|e| StoreError::TaskFailed(e.to_string()))?
            .map(Some)
    }

    fn degrade(&self, operation: &str, error: &StoreError) {
        tracing::warn!("Thumbnail cache {} failed: {}", operation, error);
        self.events.cache(CacheEvent::Degraded {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }
}
