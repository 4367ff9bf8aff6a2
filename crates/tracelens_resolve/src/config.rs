//! Resolution configuration.

use serde::{Deserialize, Serialize};

/// Tunables for path resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Page granularity of memory snapshots, in bytes
    pub memory_page_size: u64,
    /// Largest memory range a single query may read (0 = unlimited)
    pub max_memory_read: u64,
}

impl ResolveConfig {
    /// Set the snapshot page size
    #[must_use]
    pub fn with_memory_page_size(mut self, size: u64) -> Self {
        self.memory_page_size = size;
        self
    }

    /// Cap the size of a single memory read
    #[must_use]
    pub fn with_max_memory_read(mut self, limit: u64) -> Self {
        self.max_memory_read = limit;
        self
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            memory_page_size: 4096,
            max_memory_read: 64 * 1024 * 1024,
        }
    }
}
