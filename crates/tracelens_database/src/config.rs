//! Database configuration.

use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Maximum blob size in bytes (0 = unlimited)
    pub max_blob_size: usize,
    /// Keep failed resolutions in the cache
    ///
    /// Transient failures (cancellation, cycles) are never cached.
    pub cache_failures: bool,
}

impl DatabaseConfig {
    /// Set the maximum blob size
    #[must_use]
    pub fn with_max_blob_size(mut self, limit: usize) -> Self {
        self.max_blob_size = limit;
        self
    }

    /// Enable or disable caching of failed resolutions
    #[must_use]
    pub fn with_cache_failures(mut self, cache: bool) -> Self {
        self.cache_failures = cache;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_blob_size: 64 * 1024 * 1024, // 64 MB
            cache_failures: true,
        }
    }
}
