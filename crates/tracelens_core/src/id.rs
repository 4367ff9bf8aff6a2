//! Content-addressed identifiers for TRACELENS entities.
//!
//! Every identifier wraps a BLAKE3 [`Hash`] of the canonical encoding of
//! the thing it names, so equal content always yields an equal id.

use crate::encoding::CanonicalEncode;
use crate::error::Result;
use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// Capture identifier - identifies a finalized recorded session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaptureId(Hash);

impl CaptureId {
    /// Create from a content hash
    #[must_use]
    pub const fn from_hash(hash: Hash) -> Self {
        Self(hash)
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "capture<{}>", self.0.short())
    }
}

/// Blob identifier - identifies an opaque byte blob in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobId(Hash);

impl BlobId {
    /// Compute the id of a blob from its bytes
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(Hash::compute(data))
    }
}

impl std::fmt::Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob<{}>", self.0.short())
    }
}

/// Fingerprint - the cache key of a resolvable request
///
/// Derived from the request's kind and payload, never from object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(Hash);

impl Fingerprint {
    /// Fingerprint any serializable value by its canonical encoding
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidEncoding`] if the value cannot be serialized
    pub fn of<T: CanonicalEncode + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self(value.content_hash()?))
    }

    /// Create from a content hash
    #[must_use]
    pub const fn from_hash(hash: Hash) -> Self {
        Self(hash)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fp_{}", self.0.short())
    }
}
