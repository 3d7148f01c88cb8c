//! Cache key conventions shared by album and photo views.

use std::path::Path;

/// Helpers for building cache keys
pub struct CacheKey;

impl CacheKey {
    /// Key for a photo's own thumbnail: its file path
    pub fn photo(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Synthetic key under which an album's cover thumbnail is stored
    pub fn album_cover(album_id: i64) -> String {
        format!("album-{}-first", album_id)
    }
}
