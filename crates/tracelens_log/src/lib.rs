//! TRACELENS Atom Log
//!
//! Ordered, immutable sequences of recorded commands ("atoms") and the
//! handler-driven traversal resolvers use to walk them.
//! A log never changes after it is finalized, so concurrent readers need
//! no synchronization.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atom;
pub mod capture;
pub mod log;

pub use atom::{Atom, AtomKind, Call, INVOKE, MemoryWrite, ParamValue, ResourceUpdate};
pub use capture::{Capture, CaptureHeader};
pub use log::{AtomLog, LogBuilder};
