//! Replay backends.
//!
//! A replayer applies a range of atoms to a memory snapshot. The default
//! [`ObservationReplayer`] trusts the recording: it applies the memory
//! writes the capture observed and nothing else.

use crate::Context;
use crate::memory::MemorySnapshot;
use async_trait::async_trait;
use std::ops::Range;
use tracelens_core::Result;
use tracelens_log::AtomLog;

/// Backend that advances memory state across a range of atoms
#[async_trait]
pub trait Replayer: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Apply the atoms of `log` in `range`, in order, to `memory`
    ///
    /// Implementations should give up with [`tracelens_core::Error::Canceled`]
    /// once `ctx` is canceled.
    ///
    /// # Errors
    ///
    /// Returns an error if an atom cannot be applied
    async fn replay(
        &self,
        ctx: &Context,
        log: &AtomLog,
        range: Range<u64>,
        memory: &mut MemorySnapshot,
    ) -> Result<()>;
}

/// Replays the memory writes recorded in the capture
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationReplayer;

#[async_trait]
impl Replayer for ObservationReplayer {
    fn name(&self) -> &'static str {
        "observation"
    }

    async fn replay(
        &self,
        ctx: &Context,
        log: &AtomLog,
        range: Range<u64>,
        memory: &mut MemorySnapshot,
    ) -> Result<()> {
        tracing::trace!(start = range.start, end = range.end, "replaying observations");
        log.for_each_in(ctx, range, |ctx, _, atom| {
            ctx.check_canceled()?;
            match atom.as_write() {
                Some(write) => memory.apply(write),
                None => Ok(()),
            }
        })
    }
}
