//! # Handle Module
//!
//! Ephemeral references to thumbnail bytes, the moral equivalent of a
//! browser object URL. A handle is only meaningful inside the
//! [`HandleTable`] that issued it and stays alive until revoked, so
//! callers must release handles they no longer display.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const URL_SCHEME: &str = "thumb:";

/// A live reference to thumbnail bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailHandle {
    url: String,
    bytes: Arc<[u8]>,
}

impl ThumbnailHandle {
    /// Opaque URL identifying this handle, e.g. `thumb:6f1c...`
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Issues and tracks handles for the lifetime of the process
#[derive(Debug, Default)]
pub struct HandleTable {
    live: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and hand out a fresh handle
    pub fn create(&self, bytes: Vec<u8>) -> ThumbnailHandle {
        let url = format!("{}{}", URL_SCHEME, Uuid::new_v4());
        let bytes: Arc<[u8]> = bytes.into();

        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone(), bytes.clone());
        }

        ThumbnailHandle { url, bytes }
    }

    /// Look up the bytes behind a URL that has not been revoked
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.live.lock().ok()?.get(url).cloned()
    }

    /// Release a handle. Returns false for unknown or already revoked URLs.
    pub fn revoke(&self, url: &str) -> bool {
        self.live
            .lock()
            .map(|mut live| live.remove(url).is_some())
            .unwrap_or(false)
    }

    /// Number of handles not yet revoked
    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_handle_resolves_to_same_bytes() {
        let table = HandleTable::new();
        let handle = table.create(vec![1, 2, 3]);

        assert!(handle.url().starts_with("thumb:"));
        assert_eq!(handle.bytes(), &[1, 2, 3]);
        assert_eq!(table.resolve(handle.url()).as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn every_handle_gets_a_distinct_url() {
        let table = HandleTable::new();
        let a = table.create(vec![1]);
        let b = table.create(vec![1]);

        assert_ne!(a.url(), b.url());
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn revoke_releases_once() {
        let table = HandleTable::new();
        let handle = table.create(vec![9]);

        assert!(table.revoke(handle.url()));
        assert!(!table.revoke(handle.url()));
        assert!(table.resolve(handle.url()).is_none());
        assert_eq!(table.live_count(), 0);
    }

    #[test]
    fn revoked_handle_keeps_its_own_copy() {
        let table = HandleTable::new();
        let handle = table.create(vec![4, 5]);
        table.revoke(handle.url());

        assert_eq!(handle.bytes(), &[4, 5]);
    }
}
