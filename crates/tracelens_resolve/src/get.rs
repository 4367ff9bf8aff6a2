//! Path resolution.

use crate::Context;
use crate::memory::MemorySnapshot;
use crate::request::{Request, boundaries_of};
use crate::value::Value;
use std::sync::Arc;
use tracelens_core::{CaptureId, Error, Result};
use tracelens_log::{Atom, Call, Capture};
use tracelens_path::{Node, Path, find_capture};

/// Resolve the value addressed by `path`
///
/// The request is built through the database, so repeated and concurrent
/// queries for the same path share one resolution.
///
/// # Errors
///
/// Returns [`Error::CaptureNotBound`] if the path's capture is not
/// registered, or any error raised while resolving it. A capture that is
/// missing is not remembered: the same query succeeds once it is registered.
pub async fn get(ctx: &Context, path: &Path) -> Result<Value> {
    ctx.build(Request::get(path.clone())).await
}

pub(crate) async fn resolve_get(ctx: &Context, path: &Path) -> Result<Value> {
    // Only a capture named by the path itself may be used; the caller's
    // binding is not part of the request fingerprint.
    let ctx = match (find_capture(path), path.node()) {
        (Some(id), _) => ctx.with_capture(id),
        (None, Node::Blob { .. }) => ctx.clone(),
        (None, _) => {
            return Err(Error::CaptureNotBound {
                address: path.to_string(),
            });
        }
    };

    match path.node() {
        Node::Blob { id } => Ok(Value::Bytes(ctx.database().blob(id)?)),
        Node::Capture { .. } => Ok(Value::Capture(bound_capture(&ctx, path)?.header())),
        Node::Commands { .. } => Ok(Value::Commands(bound_capture(&ctx, path)?.log().clone())),
        Node::Command { index, .. } => {
            let capture = bound_capture(&ctx, path)?;
            Ok(Value::Atom(capture.log().atom(*index)?.clone()))
        }
        Node::Parameter { parent, name } => {
            let atom = ctx.build(Request::get(parent.clone())).await?;
            call_of(&atom)?
                .arg(name)
                .cloned()
                .map(Value::Param)
                .ok_or_else(|| Error::not_found(path))
        }
        Node::Result { parent } => {
            let atom = ctx.build(Request::get(parent.clone())).await?;
            call_of(&atom)?
                .result
                .clone()
                .map(Value::Param)
                .ok_or_else(|| Error::not_found(path))
        }
        Node::Memory {
            parent,
            pool,
            address,
            size,
        } => read_memory(&ctx, path, parent, *pool, *address, *size).await,
        Node::Resource { parent, id } => {
            let capture = bound_capture(&ctx, path)?;
            let index = command_of(&capture, parent)?;
            capture.log().as_slice()[..=index as usize]
                .iter()
                .rev()
                .filter_map(Atom::as_resource)
                .find(|update| update.id == *id)
                .cloned()
                .map(Value::Resource)
                .ok_or_else(|| Error::not_found(path))
        }
    }
}

/// The capture bound to `ctx`, which must be the one `path` is rooted at
fn bound_capture(ctx: &Context, path: &Path) -> Result<Arc<Capture>> {
    let not_bound = || Error::CaptureNotBound {
        address: path.to_string(),
    };
    let id: CaptureId = ctx.capture_id().ok_or_else(not_bound)?;
    ctx.database().capture(&id).map_err(|_| not_bound())
}

fn call_of(value: &Value) -> Result<&Call> {
    let atom = value.as_atom()?;
    atom.as_call()
        .ok_or_else(|| Error::mismatch("call", atom.kind().as_str()))
}

/// Index of the command `parent` addresses, checked against the log
fn command_of(capture: &Capture, parent: &Path) -> Result<u64> {
    let index = parent
        .command_index()
        .ok_or_else(|| Error::not_found(parent))?;
    capture.log().atom(index)?;
    Ok(index)
}

async fn read_memory(
    ctx: &Context,
    path: &Path,
    parent: &Path,
    pool: u32,
    address: u64,
    size: u64,
) -> Result<Value> {
    let limit = ctx.env().config().max_memory_read;
    if limit > 0 && size > limit {
        return Err(Error::OutOfRange {
            what: "memory read size".to_string(),
            index: size,
            len: limit,
        });
    }

    let capture = bound_capture(ctx, path)?;
    let index = command_of(&capture, parent)?;
    let boundaries = boundaries_of(ctx, capture.id()).await?;

    // Closest Invoke at or before the command; replay only what follows it.
    let closest = boundaries.partition_point(|&boundary| boundary <= index);
    let (base, start) = match closest.checked_sub(1).map(|p| boundaries[p]) {
        Some(boundary) => {
            let value = ctx
                .build(Request::MemorySnapshot {
                    capture: capture.id(),
                    boundary,
                })
                .await?;
            (Arc::clone(value.as_snapshot()?), boundary + 1)
        }
        None => (
            Arc::new(MemorySnapshot::new(ctx.env().config().memory_page_size)),
            0,
        ),
    };

    let bytes = if start > index {
        base.read(pool, address, size)?
    } else {
        let mut memory = MemorySnapshot::clone(&base);
        ctx.env()
            .replayer()
            .replay(ctx, capture.log(), start..index + 1, &mut memory)
            .await?;
        memory.read(pool, address, size)?
    };
    tracing::trace!(%path, replayed = (index + 1).saturating_sub(start), "memory read");
    Ok(Value::Bytes(bytes))
}
