//! Resolved values.

use crate::memory::MemorySnapshot;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracelens_core::{Error, Result};
use tracelens_log::{Atom, AtomLog, CaptureHeader, ParamValue, ResourceUpdate};

/// A value produced by resolving a request
///
/// Cloning is cheap for the large variants: logs, boundaries and
/// snapshots are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Summary of a capture
    Capture(CaptureHeader),
    /// The command list of a capture
    Commands(AtomLog),
    /// One command
    Atom(Atom),
    /// A parameter or return value
    Param(ParamValue),
    /// Raw bytes: a memory range or a blob
    Bytes(Bytes),
    /// State of a resource
    Resource(ResourceUpdate),
    /// Indices of the Invoke atoms of a capture, ascending
    Boundaries(Arc<[u64]>),
    /// Memory state after an Invoke boundary
    Snapshot(Arc<MemorySnapshot>),
}

impl Value {
    /// Short name of the variant
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Capture(_) => "capture",
            Self::Commands(_) => "commands",
            Self::Atom(_) => "atom",
            Self::Param(_) => "param",
            Self::Bytes(_) => "bytes",
            Self::Resource(_) => "resource",
            Self::Boundaries(_) => "boundaries",
            Self::Snapshot(_) => "snapshot",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::mismatch(expected, self.kind())
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not a capture summary
    pub fn as_capture(&self) -> Result<&CaptureHeader> {
        match self {
            Self::Capture(header) => Ok(header),
            other => Err(other.mismatch("capture")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not a command list
    pub fn as_commands(&self) -> Result<&AtomLog> {
        match self {
            Self::Commands(log) => Ok(log),
            other => Err(other.mismatch("commands")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not an atom
    pub fn as_atom(&self) -> Result<&Atom> {
        match self {
            Self::Atom(atom) => Ok(atom),
            other => Err(other.mismatch("atom")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not a parameter value
    pub fn as_param(&self) -> Result<&ParamValue> {
        match self {
            Self::Param(param) => Ok(param),
            other => Err(other.mismatch("param")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not raw bytes
    pub fn as_bytes(&self) -> Result<&Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            other => Err(other.mismatch("bytes")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not a resource
    pub fn as_resource(&self) -> Result<&ResourceUpdate> {
        match self {
            Self::Resource(resource) => Ok(resource),
            other => Err(other.mismatch("resource")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not a boundary list
    pub fn as_boundaries(&self) -> Result<&Arc<[u64]>> {
        match self {
            Self::Boundaries(boundaries) => Ok(boundaries),
            other => Err(other.mismatch("boundaries")),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if this is not a memory snapshot
    pub fn as_snapshot(&self) -> Result<&Arc<MemorySnapshot>> {
        match self {
            Self::Snapshot(snapshot) => Ok(snapshot),
            other => Err(other.mismatch("snapshot")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture(header) => write!(
                f,
                "{} \"{}\": {} atoms, {} invokes",
                header.id, header.name, header.atom_count, header.invoke_count
            ),
            Self::Commands(log) => write!(f, "{} commands", log.len()),
            Self::Atom(atom) => write!(f, "{}", atom),
            Self::Param(param) => match param {
                ParamValue::Bool(v) => write!(f, "{}", v),
                ParamValue::Int(v) => write!(f, "{}", v),
                ParamValue::Uint(v) => write!(f, "{}", v),
                ParamValue::Str(v) => write!(f, "{:?}", v),
                ParamValue::Bytes(v) => write!(f, "{}", hex::encode(v)),
                ParamValue::Pointer { pool, address } => write!(f, "pool({})@0x{:x}", pool, address),
            },
            Self::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
            Self::Resource(resource) => write!(
                f,
                "resource {} \"{}\": {}",
                resource.id,
                resource.label,
                hex::encode(&resource.data)
            ),
            Self::Boundaries(boundaries) => write!(f, "{:?}", boundaries),
            Self::Snapshot(snapshot) => write!(f, "memory snapshot ({} pages)", snapshot.page_count()),
        }
    }
}
