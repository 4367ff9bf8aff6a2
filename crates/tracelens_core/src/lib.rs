//! TRACELENS Core Types
//!
//! Hashes, content-addressed identifiers, canonical encoding and the
//! error type shared by every layer of the query engine.
//! This crate contains pure types and logic with no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
pub mod hash;
pub mod id;

// Re-exports
pub use encoding::CanonicalEncode;
pub use error::{Error, Result};
pub use hash::Hash;
pub use id::{BlobId, CaptureId, Fingerprint};
