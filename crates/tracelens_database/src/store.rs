//! Content-addressed store for captures and blobs.
//!
//! Captures and blobs are immutable and keyed by the hash of their
//! content, so inserting the same content twice is a no-op.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracelens_core::{BlobId, CaptureId, Error, Result};
use tracelens_log::Capture;

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of blobs
    pub blob_count: usize,
    /// Total bytes stored in blobs
    pub blob_bytes: u64,
    /// Total number of captures
    pub capture_count: usize,
}

/// In-memory content store
pub struct ContentStore {
    /// Maximum blob size in bytes (0 = unlimited)
    max_blob_size: usize,
    /// Blob storage indexed by content address
    blobs: RwLock<HashMap<BlobId, Bytes>>,
    /// Finalized captures indexed by content address
    captures: RwLock<HashMap<CaptureId, Arc<Capture>>>,
}

impl ContentStore {
    /// Create a new content store
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(0)
    }

    /// Create with a maximum blob size (0 = unlimited)
    #[must_use]
    pub fn with_limit(max_blob_size: usize) -> Self {
        Self {
            max_blob_size,
            blobs: RwLock::new(HashMap::new()),
            captures: RwLock::new(HashMap::new()),
        }
    }

    /// Write a blob to the store
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlobTooLarge`] if the blob exceeds the size limit
    pub fn write_blob(&self, data: impl Into<Bytes>) -> Result<BlobId> {
        let data = data.into();
        if self.max_blob_size > 0 && data.len() > self.max_blob_size {
            return Err(Error::BlobTooLarge {
                size: data.len(),
                limit: self.max_blob_size,
            });
        }

        let id = BlobId::compute(&data);
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert(data);
        Ok(id)
    }

    /// Read a blob from the store
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressNotFound`] if no blob has this id
    pub fn read_blob(&self, id: &BlobId) -> Result<Bytes> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }

    /// Register a finalized capture, returning the shared handle
    ///
    /// If a capture with the same id is already registered, that one is kept.
    pub fn add_capture(&self, capture: Capture) -> Arc<Capture> {
        let mut captures = self.captures.write().unwrap_or_else(PoisonError::into_inner);
        captures
            .entry(capture.id())
            .or_insert_with(|| Arc::new(capture))
            .clone()
    }

    /// Look up a registered capture
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotBound`] if no capture has this id. The
    /// error is transient: the capture may be registered later.
    pub fn capture(&self, id: &CaptureId) -> Result<Arc<Capture>> {
        self.captures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::CaptureNotBound {
                address: id.to_string(),
            })
    }

    /// Get store statistics
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        StoreStats {
            blob_count: blobs.len(),
            blob_bytes: blobs.values().map(|b| b.len() as u64).sum(),
            capture_count: self
                .captures
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelens_log::{Atom, AtomLog, Call};

    fn capture(name: &str) -> Capture {
        Capture::new(name, AtomLog::new(vec![Atom::Call(Call::new("glFinish"))])).unwrap()
    }

    #[test]
    fn test_blob_write_read() {
        let store = ContentStore::new();
        let id = store.write_blob(b"hello world".to_vec()).unwrap();
        assert_eq!(store.read_blob(&id).unwrap(), Bytes::from_static(b"hello world"));
    }

    #[test]
    fn test_blob_missing() {
        let store = ContentStore::new();
        let result = store.read_blob(&BlobId::compute(b"other"));
        assert!(matches!(result, Err(Error::AddressNotFound { .. })));
    }

    #[test]
    fn test_blob_duplicate() {
        let store = ContentStore::new();
        let id1 = store.write_blob(b"duplicate".to_vec()).unwrap();
        let id2 = store.write_blob(b"duplicate".to_vec()).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.stats().blob_count, 1);
        assert_eq!(store.stats().blob_bytes, 9);
    }

    #[test]
    fn test_blob_too_large() {
        let store = ContentStore::with_limit(10);
        let result = store.write_blob(vec![0u8; 100]);
        assert_eq!(result, Err(Error::BlobTooLarge { size: 100, limit: 10 }));
    }

    #[test]
    fn test_capture_registry() {
        let store = ContentStore::new();
        let first = store.add_capture(capture("frame"));
        let again = store.add_capture(capture("frame"));
        assert!(Arc::ptr_eq(&first, &again));

        let found = store.capture(&first.id()).unwrap();
        assert_eq!(found.name(), "frame");
        assert_eq!(store.stats().capture_count, 1);
    }

    #[test]
    fn test_capture_missing() {
        let store = ContentStore::new();
        let id = capture("unregistered").id();
        let err = store.capture(&id).unwrap_err();
        assert!(matches!(err, Error::CaptureNotBound { .. }));
        assert!(err.is_transient());

        store.add_capture(capture("unregistered"));
        assert_eq!(store.capture(&id).unwrap().name(), "unregistered");
    }
}
