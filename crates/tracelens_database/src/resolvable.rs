//! The contract between the database and the requests it resolves.

use crate::context::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracelens_core::Result;

/// A request the database knows how to turn into a value
///
/// Resolvables are value objects: the fingerprint used as the cache key is
/// the hash of the canonical encoding of `self`, so two requests that
/// describe the same computation must serialize identically.
///
/// `resolve` must be deterministic. It may call [`Context::build`] for the
/// values it depends on; those calls go through the same cache.
#[async_trait]
pub trait Resolvable: Serialize + fmt::Display + Send + Sync + Sized + 'static {
    /// Value produced by a successful resolution
    type Value: Clone + Send + Sync + 'static;

    /// Services resolvers need besides the cache, injected into the database
    type Env: Send + Sync + 'static;

    /// Compute the value this request describes
    async fn resolve(&self, ctx: &Context<Self>) -> Result<Self::Value>;
}
