//! TRACELENS Paths
//!
//! A [`Path`] names a location derivable from a capture: the command list,
//! one command, a parameter of a command, a range of traced memory after a
//! command, and so on. Paths nest, compare structurally, and hash by
//! value, so they can be used directly inside cache keys.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod path;

pub use path::{Node, Path, find_capture};
