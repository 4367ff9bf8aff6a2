//! Resolvable requests.

use crate::Context;
use crate::config::ResolveConfig;
use crate::get::resolve_get;
use crate::memory::MemorySnapshot;
use crate::replay::{ObservationReplayer, Replayer};
use crate::value::Value;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracelens_core::{CaptureId, Error, Result};
use tracelens_database::Resolvable;
use tracelens_path::Path;

/// Every request the database can resolve
///
/// The fingerprint of a request is the hash of its canonical encoding, so
/// two requests with equal payloads share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    /// The value addressed by a path
    Get {
        /// Address to resolve
        path: Path,
    },
    /// Indices of every Invoke atom of a capture
    InvokeBoundaries {
        /// Capture to scan
        capture: CaptureId,
    },
    /// Memory state after the Invoke atom at index `boundary`
    MemorySnapshot {
        /// Capture to replay
        capture: CaptureId,
        /// Atom index of an Invoke atom
        boundary: u64,
    },
}

impl Request {
    /// Request the value at `path`
    #[must_use]
    pub const fn get(path: Path) -> Self {
        Self::Get { path }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get { path } => write!(f, "get({})", path),
            Self::InvokeBoundaries { capture } => write!(f, "invoke_boundaries({})", capture),
            Self::MemorySnapshot { capture, boundary } => {
                write!(f, "memory_snapshot({}, {})", capture, boundary)
            }
        }
    }
}

/// Services available to every resolver
pub struct Environment {
    config: ResolveConfig,
    replayer: Arc<dyn Replayer>,
}

impl Environment {
    /// Environment replaying with `replayer`
    #[must_use]
    pub fn new(replayer: impl Replayer) -> Self {
        Self {
            config: ResolveConfig::default(),
            replayer: Arc::new(replayer),
        }
    }

    /// Replace the resolution settings
    #[must_use]
    pub fn with_config(mut self, config: ResolveConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolution settings
    #[must_use]
    pub const fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// The replay backend
    #[must_use]
    pub fn replayer(&self) -> &dyn Replayer {
        self.replayer.as_ref()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(ObservationReplayer)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("replayer", &self.replayer.name())
            .finish()
    }
}

#[async_trait]
impl Resolvable for Request {
    type Value = Value;
    type Env = Environment;

    async fn resolve(&self, ctx: &Context) -> Result<Value> {
        match self {
            Self::Get { path } => resolve_get(ctx, path).await,
            Self::InvokeBoundaries { capture } => invoke_boundaries(ctx, *capture),
            Self::MemorySnapshot { capture, boundary } => {
                memory_snapshot(ctx, *capture, *boundary).await
            }
        }
    }
}

fn invoke_boundaries(ctx: &Context, capture: CaptureId) -> Result<Value> {
    let capture = ctx.database().capture(&capture)?;
    let boundaries: Arc<[u64]> = (0..)
        .zip(capture.log().iter())
        .filter(|(_, atom)| atom.is_invoke())
        .map(|(index, _)| index)
        .collect();
    tracing::debug!(capture = %capture.id(), count = boundaries.len(), "found invoke boundaries");
    Ok(Value::Boundaries(boundaries))
}

/// Boundaries of `capture`, built through the database
pub(crate) async fn boundaries_of(ctx: &Context, capture: CaptureId) -> Result<Arc<[u64]>> {
    let value = ctx.build(Request::InvokeBoundaries { capture }).await?;
    Ok(Arc::clone(value.as_boundaries()?))
}

async fn memory_snapshot(ctx: &Context, capture_id: CaptureId, boundary: u64) -> Result<Value> {
    let capture = ctx.database().capture(&capture_id)?;
    let boundaries = boundaries_of(ctx, capture_id).await?;
    let position = boundaries.binary_search(&boundary).map_err(|_| {
        Error::not_found(format!("invoke boundary {} of {}", boundary, capture_id))
    })?;

    let (mut memory, start) = match position.checked_sub(1).map(|p| boundaries[p]) {
        Some(previous) => {
            let value = ctx
                .build(Request::MemorySnapshot {
                    capture: capture_id,
                    boundary: previous,
                })
                .await?;
            (MemorySnapshot::clone(value.as_snapshot()?), previous + 1)
        }
        None => (MemorySnapshot::new(ctx.env().config().memory_page_size), 0),
    };

    ctx.env()
        .replayer()
        .replay(ctx, capture.log(), start..boundary + 1, &mut memory)
        .await?;
    tracing::debug!(capture = %capture_id, boundary, pages = memory.page_count(), "memory snapshot built");
    Ok(Value::Snapshot(Arc::new(memory)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use tracelens_core::Fingerprint;
    use tracelens_log::{Atom, AtomLog, Call, Capture, INVOKE};

    fn capture() -> Capture {
        let log = AtomLog::new(vec![
            Atom::Call(Call::new("glClear")),
            INVOKE.clone(),
            Atom::Call(Call::new("glFlush")),
            INVOKE.clone(),
        ]);
        Capture::new("frame", log).unwrap()
    }

    #[tokio::test]
    async fn test_invoke_boundaries() {
        let db = Database::new(Environment::default());
        let id = db.add_capture(capture());

        let value = db.context().build(Request::InvokeBoundaries { capture: id }).await.unwrap();
        assert_eq!(&value.as_boundaries().unwrap()[..], &[1, 3]);
    }

    #[tokio::test]
    async fn test_snapshot_at_non_boundary() {
        let db = Database::new(Environment::default());
        let id = db.add_capture(capture());

        let err = db
            .context()
            .build(Request::MemorySnapshot {
                capture: id,
                boundary: 2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AddressNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_capture() {
        let db = Database::new(Environment::default());
        let request = Request::InvokeBoundaries { capture: capture().id() };

        let err = db.context().build(request.clone()).await.unwrap_err();
        assert!(matches!(err, Error::CaptureNotBound { .. }));
        assert!(!db.contains(&Fingerprint::of(&request).unwrap()));

        db.add_capture(capture());
        let value = db.context().build(request).await.unwrap();
        assert_eq!(&value.as_boundaries().unwrap()[..], &[1, 3]);
    }

    #[test]
    fn test_request_fingerprints() {
        let id = capture().id();
        let a = Request::MemorySnapshot { capture: id, boundary: 1 };
        let b = Request::MemorySnapshot { capture: id, boundary: 3 };
        assert_eq!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&a.clone()).unwrap());
        assert_ne!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }

    #[test]
    fn test_display() {
        let id = capture().id();
        assert_eq!(
            Request::InvokeBoundaries { capture: id }.to_string(),
            format!("invoke_boundaries({})", id)
        );
    }
}
