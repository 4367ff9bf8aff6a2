//! TRACELENS Database
//!
//! The shared, concurrency-safe store that turns resolvable requests into
//! values. Every distinct request (by [`Fingerprint`]) is resolved at most
//! once at a time; completed results are cached for the lifetime of the
//! database and handed to every caller that asks again.
//!
//! Resolvers call back into the database for the values they depend on,
//! so the dependency graph is discovered lazily. Dependency cycles are
//! detected and reported instead of deadlocking.
//!
//! [`Fingerprint`]: tracelens_core::Fingerprint

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod database;
pub mod resolvable;
pub mod stats;
pub mod store;

mod graph;

#[cfg(test)]
pub(crate) mod testing;

pub use config::DatabaseConfig;
pub use context::Context;
pub use database::Database;
pub use resolvable::Resolvable;
pub use stats::DatabaseStats;
pub use store::{ContentStore, StoreStats};
