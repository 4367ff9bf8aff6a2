//! TRACELENS Resolve
//!
//! The requests a [`Database`] knows how to resolve, and [`get`], the one
//! entry point callers use to turn a [`Path`] into a [`Value`].
//!
//! Memory state is reconstructed incrementally: the state after every
//! Invoke boundary is a cached [`MemorySnapshot`], built from the previous
//! boundary's snapshot, and a memory query replays only the atoms between
//! the closest boundary and the queried command.
//!
//! [`Path`]: tracelens_path::Path

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod get;
pub mod memory;
pub mod replay;
pub mod request;
pub mod value;

pub use config::ResolveConfig;
pub use get::get;
pub use memory::MemorySnapshot;
pub use replay::{ObservationReplayer, Replayer};
pub use request::{Environment, Request};
pub use value::Value;

/// Database resolving [`Request`]s
pub type Database = tracelens_database::Database<Request>;

/// Context for resolving [`Request`]s
pub type Context = tracelens_database::Context<Request>;
