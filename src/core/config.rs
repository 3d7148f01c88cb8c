//! Cache configuration.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};

/// 500 MiB
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 500 * 1024 * 1024;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 200;
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Tunables for the thumbnail cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Soft capacity in bytes; eviction runs before an insert would exceed it
    pub max_cache_size: u64,
    /// Longest thumbnail side in pixels
    pub thumbnail_size: u32,
    /// JPEG quality factor, 0.0-1.0
    pub quality: f32,
    /// Refuse inserts that eviction cannot make room for
    pub strict_capacity: bool,
}

impl CacheConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            quality: DEFAULT_QUALITY,
            strict_capacity: false,
        }
    }

    pub fn max_cache_size(mut self, bytes: u64) -> Self {
        self.max_cache_size = bytes;
        self
    }

    pub fn thumbnail_size(mut self, pixels: u32) -> Self {
        self.thumbnail_size = pixels;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// Fail closed instead of inserting past capacity.
    ///
    /// Off by default: an oversized thumbnail is still stored and served.
    pub fn strict_capacity(mut self, strict: bool) -> Self {
        self.strict_capacity = strict;
        self
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, CacheError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CacheError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_cache_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_cache_size must be greater than zero".to_string(),
            ));
        }
        if self.thumbnail_size == 0 {
            return Err(CacheError::InvalidConfig(
                "thumbnail_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(CacheError::InvalidConfig(format!(
                "quality must be between 0 and 1, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_configuration() {
        let config = CacheConfig::new();
        assert_eq!(config.max_cache_size, 500 * 1024 * 1024);
        assert_eq!(config.thumbnail_size, 200);
        assert_eq!(config.quality, 0.8);
        assert!(!config.strict_capacity);
    }

    #[test]
    fn config_builder_works() {
        let config = CacheConfig::new()
            .max_cache_size(1000)
            .thumbnail_size(128)
            .quality(0.7)
            .strict_capacity(true);

        assert_eq!(config.max_cache_size, 1000);
        assert_eq!(config.thumbnail_size, 128);
        assert_eq!(config.quality, 0.7);
        assert!(config.strict_capacity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        assert!(CacheConfig::new().quality(1.2).validate().is_err());
        assert!(CacheConfig::new().quality(-0.1).validate().is_err());
        assert!(CacheConfig::new().quality(f32::NAN).validate().is_err());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(CacheConfig::new().max_cache_size(0).validate().is_err());
        assert!(CacheConfig::new().thumbnail_size(0).validate().is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = CacheConfig::from_json_str(r#"{ "max_cache_size": 4096 }"#).unwrap();

        assert_eq!(config.max_cache_size, 4096);
        assert_eq!(config.thumbnail_size, DEFAULT_THUMBNAIL_SIZE);
    }

    #[test]
    fn json_with_invalid_values_is_rejected() {
        assert!(CacheConfig::from_json_str(r#"{ "quality": 3.0 }"#).is_err());
        assert!(CacheConfig::from_json_str("not json").is_err());
    }
}
