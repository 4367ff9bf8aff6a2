//! Atom types for the command log.
//!
//! An atom is one recorded command. Atoms are immutable once recorded.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution-boundary sentinel.
///
/// Shared so that producers can mark a boundary without building a new atom.
pub static INVOKE: Atom = Atom::Invoke;

/// Atom kind - discriminant of an [`Atom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomKind {
    /// [`Atom::Call`]
    Call,
    /// [`Atom::Write`]
    Write,
    /// [`Atom::Resource`]
    Resource,
    /// [`Atom::Invoke`]
    Invoke,
}

impl AtomKind {
    /// Lowercase name, as used in serialized atoms
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Write => "write",
            Self::Resource => "resource",
            Self::Invoke => "invoke",
        }
    }
}

impl fmt::Display for AtomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer, enums and bitfields included
    Uint(u64),
    /// UTF-8 string
    Str(String),
    /// Raw bytes passed by value
    Bytes(Vec<u8>),
    /// Address inside a traced memory pool
    Pointer {
        /// Memory pool
        pool: u32,
        /// Address within the pool
        address: u64,
    },
}

/// A recorded API call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Name of the called function
    pub function: String,
    /// Arguments in declaration order
    #[serde(default)]
    pub args: IndexMap<String, ParamValue>,
    /// Return value, if the function returns one
    #[serde(default)]
    pub result: Option<ParamValue>,
}

impl Call {
    /// Call to `function` with no arguments
    #[must_use]
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: IndexMap::new(),
            result: None,
        }
    }

    /// Append an argument
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Set the return value
    #[must_use]
    pub fn with_result(mut self, value: ParamValue) -> Self {
        self.result = Some(value);
        self
    }

    /// Argument by name
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&ParamValue> {
        self.args.get(name)
    }
}

/// Bytes the traced application wrote into a memory pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWrite {
    /// Memory pool written to
    pub pool: u32,
    /// First written address
    pub address: u64,
    /// Written bytes
    pub data: Bytes,
}

impl MemoryWrite {
    /// Write of `data` at `address` in `pool`
    pub fn new(pool: u32, address: u64, data: impl Into<Bytes>) -> Self {
        Self {
            pool,
            address,
            data: data.into(),
        }
    }

    /// One past the last written address
    #[must_use]
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.data.len() as u64)
    }
}

/// New state of a named resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpdate {
    /// Resource identifier, stable across the capture
    pub id: u64,
    /// Human-readable resource label
    pub label: String,
    /// Full new contents
    pub data: Bytes,
}

impl ResourceUpdate {
    /// Update of resource `id` to `data`
    pub fn new(id: u64, label: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            label: label.into(),
            data: data.into(),
        }
    }
}

/// One recorded command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Atom {
    /// API call
    Call(Call),
    /// Observed memory write
    Write(MemoryWrite),
    /// Resource state change
    Resource(ResourceUpdate),
    /// Execution boundary; see [`INVOKE`]
    Invoke,
}

impl Atom {
    /// Discriminant of this atom
    #[must_use]
    pub const fn kind(&self) -> AtomKind {
        match self {
            Self::Call(_) => AtomKind::Call,
            Self::Write(_) => AtomKind::Write,
            Self::Resource(_) => AtomKind::Resource,
            Self::Invoke => AtomKind::Invoke,
        }
    }

    /// Whether this atom is an execution boundary
    #[must_use]
    pub const fn is_invoke(&self) -> bool {
        matches!(self, Self::Invoke)
    }

    /// The call, if this atom is one
    #[must_use]
    pub const fn as_call(&self) -> Option<&Call> {
        match self {
            Self::Call(call) => Some(call),
            _ => None,
        }
    }

    /// The memory write, if this atom is one
    #[must_use]
    pub const fn as_write(&self) -> Option<&MemoryWrite> {
        match self {
            Self::Write(write) => Some(write),
            _ => None,
        }
    }

    /// The resource update, if this atom is one
    #[must_use]
    pub const fn as_resource(&self) -> Option<&ResourceUpdate> {
        match self {
            Self::Resource(update) => Some(update),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(call) => write!(f, "call {}", call.function),
            Self::Write(write) => write!(
                f,
                "write pool={} 0x{:x}..0x{:x}",
                write.pool,
                write.address,
                write.end()
            ),
            Self::Resource(update) => write!(f, "resource {} ({})", update.id, update.label),
            Self::Invoke => f.write_str("invoke"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_kind() {
        assert_eq!(Atom::Call(Call::new("glClear")).kind(), AtomKind::Call);
        assert_eq!(INVOKE.kind(), AtomKind::Invoke);
        assert_eq!(AtomKind::Resource.to_string(), "resource");
        let write = Atom::Write(MemoryWrite::new(0, 0, vec![1]));
        assert!(write.as_write().is_some());
        assert!(write.as_call().is_none());
    }

    #[test]
    fn test_invoke_marker_is_shared() {
        let a: &'static Atom = &INVOKE;
        let b: &'static Atom = &INVOKE;
        assert!(std::ptr::eq(a, b));
        assert!(a.is_invoke());
    }

    #[test]
    fn test_call_args_keep_order() {
        let call = Call::new("glDrawArrays")
            .with_arg("mode", ParamValue::Uint(4))
            .with_arg("first", ParamValue::Int(0))
            .with_arg("count", ParamValue::Int(3));
        let names: Vec<_> = call.args.keys().map(String::as_str).collect();
        assert_eq!(names, ["mode", "first", "count"]);
        assert_eq!(call.arg("count"), Some(&ParamValue::Int(3)));
        assert_eq!(call.arg("missing"), None);
    }

    #[test]
    fn test_memory_write_end() {
        let write = MemoryWrite::new(0, 0x10, vec![1, 2, 3, 4]);
        assert_eq!(write.end(), 0x14);
        assert_eq!(Atom::Write(write).to_string(), "write pool=0 0x10..0x14");
    }

    #[test]
    fn test_atom_json() {
        let atom: Atom = serde_json::from_str(
            r#"{"call": {"function": "glFlush"}}"#,
        )
        .unwrap();
        assert_eq!(atom, Atom::Call(Call::new("glFlush")));

        let invoke: Atom = serde_json::from_str(r#""invoke""#).unwrap();
        assert!(invoke.is_invoke());
    }
}
