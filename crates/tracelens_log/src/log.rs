//! The atom log and its handler-driven traversal.

use crate::atom::{Atom, INVOKE};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use tracelens_core::{Error, Result};

/// An ordered, immutable sequence of atoms
///
/// Cloning is cheap: clones share the same storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomLog {
    atoms: Arc<[Atom]>,
}

impl AtomLog {
    /// Create a log from recorded atoms
    #[must_use]
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self {
            atoms: atoms.into(),
        }
    }

    /// Number of atoms
    #[must_use]
    pub fn len(&self) -> u64 {
        self.atoms.len() as u64
    }

    /// Check if the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Atom at `index`, if any
    #[must_use]
    pub fn get(&self, index: u64) -> Option<&Atom> {
        usize::try_from(index).ok().and_then(|i| self.atoms.get(i))
    }

    /// Atom at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index` is past the end of the log
    pub fn atom(&self, index: u64) -> Result<&Atom> {
        self.get(index).ok_or_else(|| Error::OutOfRange {
            what: "atom".to_string(),
            index,
            len: self.len(),
        })
    }

    /// Iterate over all atoms in recorded order
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    /// All atoms as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Atom] {
        &self.atoms
    }

    /// Hand every atom from `start` to the end of the log to `handler`
    ///
    /// See [`AtomLog::for_each_in`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `start` is past the end of the log,
    /// or [`Error::HandlerAborted`] wrapping the first handler failure
    pub fn for_each<C, F>(&self, ctx: &C, start: u64, handler: F) -> Result<()>
    where
        F: FnMut(&C, u64, &Atom) -> Result<()>,
    {
        self.for_each_in(ctx, start..self.len(), handler)
    }

    /// Hand each atom in `range` to `handler`, one at a time, in order
    ///
    /// The first handler failure stops the traversal; later atoms are
    /// never visited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the range reaches past the end of the
    /// log, or [`Error::HandlerAborted`] wrapping the first handler failure
    pub fn for_each_in<C, F>(&self, ctx: &C, range: Range<u64>, mut handler: F) -> Result<()>
    where
        F: FnMut(&C, u64, &Atom) -> Result<()>,
    {
        let len = self.len();
        if range.start > len || range.end > len {
            return Err(Error::OutOfRange {
                what: "atom".to_string(),
                index: range.start.max(range.end),
                len,
            });
        }

        for (index, atom) in (range.start..range.end).zip(&self.atoms[range.start as usize..]) {
            if let Err(source) = handler(ctx, index, atom) {
                tracing::trace!(index, kind = %atom.kind(), "atom handler aborted traversal");
                return Err(Error::HandlerAborted {
                    index,
                    source: Box::new(source),
                });
            }
        }

        Ok(())
    }
}

impl Default for AtomLog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Atom>> for AtomLog {
    fn from(atoms: Vec<Atom>) -> Self {
        Self::new(atoms)
    }
}

impl FromIterator<Atom> for AtomLog {
    fn from_iter<I: IntoIterator<Item = Atom>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Builder for appending atoms before a log is finalized
pub struct LogBuilder {
    atoms: Vec<Atom>,
}

impl LogBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self { atoms: Vec::new() }
    }

    /// Append an atom, returning its index
    pub fn push(&mut self, atom: Atom) -> u64 {
        self.atoms.push(atom);
        self.atoms.len() as u64 - 1
    }

    /// Append an execution boundary, returning its index
    pub fn invoke(&mut self) -> u64 {
        self.push(INVOKE.clone())
    }

    /// Number of atoms appended so far
    #[must_use]
    pub fn len(&self) -> u64 {
        self.atoms.len() as u64
    }

    /// Whether nothing has been appended
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Freeze the atoms into an immutable log
    pub fn finalize(self) -> AtomLog {
        AtomLog::new(self.atoms)
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
