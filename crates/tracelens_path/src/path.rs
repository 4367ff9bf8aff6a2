//! Path nodes and builders.
//!
//! Every non-root node holds its parent by value. A parent must exist
//! before a child can be built from it and is never replaced afterwards,
//! so parent chains are finite and acyclic. Deserialized paths go through
//! the same parent-kind check as the builders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracelens_core::{BlobId, CaptureId};

/// Terminal addressing node of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Root: a capture
    Capture {
        /// Capture identifier
        id: CaptureId,
    },
    /// Root: a content-addressed blob held by the database
    Blob {
        /// Blob identifier
        id: BlobId,
    },
    /// The command list of a capture
    Commands {
        /// Capture path
        parent: Path,
    },
    /// One command
    Command {
        /// Commands path
        parent: Path,
        /// Position in the command list
        index: u64,
    },
    /// A named parameter of a command
    Parameter {
        /// Command path
        parent: Path,
        /// Parameter name
        name: String,
    },
    /// The return value of a command
    Result {
        /// Command path
        parent: Path,
    },
    /// A byte range of traced memory after a command
    Memory {
        /// Command path
        parent: Path,
        /// Memory pool
        pool: u32,
        /// First address
        address: u64,
        /// Number of bytes
        size: u64,
    },
    /// State of a resource after a command
    Resource {
        /// Command path
        parent: Path,
        /// Resource identifier
        id: u64,
    },
}

impl Node {
    /// Parent path, or `None` for roots
    #[must_use]
    pub const fn parent(&self) -> Option<&Path> {
        match self {
            Self::Capture { .. } | Self::Blob { .. } => None,
            Self::Commands { parent }
            | Self::Command { parent, .. }
            | Self::Parameter { parent, .. }
            | Self::Result { parent }
            | Self::Memory { parent, .. }
            | Self::Resource { parent, .. } => Some(parent),
        }
    }

    /// Short name of the node kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Capture { .. } => "capture",
            Self::Blob { .. } => "blob",
            Self::Commands { .. } => "commands",
            Self::Command { .. } => "command",
            Self::Parameter { .. } => "parameter",
            Self::Result { .. } => "result",
            Self::Memory { .. } => "memory",
            Self::Resource { .. } => "resource",
        }
    }

    /// Kind of node this one must be built under, or `None` for roots
    const fn parent_kind(&self) -> Option<&'static str> {
        match self {
            Self::Capture { .. } | Self::Blob { .. } => None,
            Self::Commands { .. } => Some("capture"),
            Self::Command { .. } => Some("commands"),
            Self::Parameter { .. }
            | Self::Result { .. }
            | Self::Memory { .. }
            | Self::Resource { .. } => Some("command"),
        }
    }

    fn check_parent(&self) -> Result<(), String> {
        match (self.parent(), self.parent_kind()) {
            (Some(parent), Some(expected)) if parent.node().kind() != expected => Err(format!(
                "cannot build a {} path under a {} path ({})",
                self.kind(),
                parent.node().kind(),
                parent
            )),
            _ => Ok(()),
        }
    }
}

/// An immutable, structurally comparable address
///
/// Cloning is cheap: the node and its parents are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "Arc<Node>", try_from = "Arc<Node>")]
pub struct Path(Arc<Node>);

impl Path {
    fn new(node: Node) -> Self {
        if let Err(message) = node.check_parent() {
            panic!("{}", message);
        }
        Self(Arc::new(node))
    }

    /// Root path of a capture
    #[must_use]
    pub fn capture(id: CaptureId) -> Self {
        Self::new(Node::Capture { id })
    }

    /// Root path of a blob
    #[must_use]
    pub fn blob(id: BlobId) -> Self {
        Self::new(Node::Blob { id })
    }

    /// The command list of this capture
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a capture path
    #[must_use]
    pub fn commands(&self) -> Self {
        Self::new(Node::Commands {
            parent: self.clone(),
        })
    }

    /// The command at `index` of this command list
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a commands path
    #[must_use]
    pub fn index(&self, index: u64) -> Self {
        Self::new(Node::Command {
            parent: self.clone(),
            index,
        })
    }

    /// A named parameter of this command
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a command path
    #[must_use]
    pub fn parameter(&self, name: impl Into<String>) -> Self {
        Self::new(Node::Parameter {
            parent: self.clone(),
            name: name.into(),
        })
    }

    /// The return value of this command
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a command path
    #[must_use]
    pub fn result(&self) -> Self {
        Self::new(Node::Result {
            parent: self.clone(),
        })
    }

    /// `size` bytes of pool memory at `address`, as they are after this command
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a command path
    #[must_use]
    pub fn memory(&self, pool: u32, address: u64, size: u64) -> Self {
        Self::new(Node::Memory {
            parent: self.clone(),
            pool,
            address,
            size,
        })
    }

    /// The state of resource `id` after this command
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a command path
    #[must_use]
    pub fn resource(&self, id: u64) -> Self {
        Self::new(Node::Resource {
            parent: self.clone(),
            id,
        })
    }

    /// The terminal node
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// The parent path, or `None` for roots
    #[must_use]
    pub fn parent(&self) -> Option<&Path> {
        self.0.parent()
    }

    /// The root of the parent chain
    #[must_use]
    pub fn root(&self) -> &Path {
        let mut path = self;
        while let Some(parent) = path.parent() {
            path = parent;
        }
        path
    }

    /// Index of the nearest enclosing command, if any
    #[must_use]
    pub fn command_index(&self) -> Option<u64> {
        let mut path = self;
        loop {
            if let Node::Command { index, .. } = path.node() {
                return Some(*index);
            }
            path = path.parent()?;
        }
    }
}

impl From<Path> for Arc<Node> {
    fn from(path: Path) -> Self {
        path.0
    }
}

impl TryFrom<Arc<Node>> for Path {
    type Error = String;

    fn try_from(node: Arc<Node>) -> Result<Self, String> {
        node.check_parent()?;
        Ok(Self(node))
    }
}

/// Find the capture a path belongs to
///
/// Walks parent links up to the root. Returns `None` if the path is not
/// rooted at a capture.
#[must_use]
pub fn find_capture(path: &Path) -> Option<CaptureId> {
    match path.root().node() {
        Node::Capture { id } => Some(*id),
        _ => None,
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Capture { id } => write!(f, "{}", id),
            Node::Blob { id } => write!(f, "{}", id),
            Node::Commands { parent } => write!(f, "{}.commands", parent),
            Node::Command { parent, index } => write!(f, "{}[{}]", parent, index),
            Node::Parameter { parent, name } => write!(f, "{}.{}", parent, name),
            Node::Result { parent } => write!(f, "{}.<result>", parent),
            Node::Memory {
                parent,
                pool,
                address,
                size,
            } => write!(
                f,
                "{}.memory(pool={}, 0x{:x}..0x{:x})",
                parent,
                pool,
                address,
                address.saturating_add(*size)
            ),
            Node::Resource { parent, id } => write!(f, "{}.resource({})", parent, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use tracelens_core::{CanonicalEncode, Hash};

    fn capture_id(seed: &[u8]) -> CaptureId {
        CaptureId::from_hash(Hash::compute(seed))
    }

    #[test]
    fn test_find_capture() {
        let id = capture_id(b"frame");
        let path = Path::capture(id).commands().index(4).memory(0, 0x100, 16);
        assert_eq!(find_capture(&path), Some(id));
        assert_eq!(find_capture(&Path::capture(id)), Some(id));
    }

    #[test]
    fn test_find_capture_without_capture_root() {
        let path = Path::blob(BlobId::compute(b"data"));
        assert_eq!(find_capture(&path), None);
    }

    #[test]
    fn test_structural_equality() {
        let id = capture_id(b"frame");
        let commands = Path::capture(id).commands();
        let a = commands.index(3).parameter("count");
        let b = Path::capture(id).commands().index(3).parameter("count");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_components_distinguish_paths() {
        let commands = Path::capture(capture_id(b"frame")).commands();
        assert_ne!(commands.index(3), commands.index(4));
        assert_ne!(commands.index(3).parameter("a"), commands.index(3).parameter("b"));
        assert_ne!(commands.index(3).result(), commands.index(3).parameter("result"));
        assert_ne!(
            commands.index(3).memory(0, 0, 4),
            commands.index(3).memory(1, 0, 4)
        );
        assert_ne!(
            Path::capture(capture_id(b"a")).commands(),
            Path::capture(capture_id(b"b")).commands()
        );
    }

    #[test]
    fn test_ordering_follows_parent_chain() {
        let commands = Path::capture(capture_id(b"frame")).commands();
        assert!(commands.index(1) < commands.index(2));
    }

    #[test]
    fn test_parent_and_root() {
        let id = capture_id(b"frame");
        let command = Path::capture(id).commands().index(2);
        let param = command.parameter("mode");
        assert_eq!(param.parent(), Some(&command));
        assert_eq!(param.root(), &Path::capture(id));
        assert_eq!(param.command_index(), Some(2));
        assert_eq!(Path::capture(id).command_index(), None);
    }

    #[test]
    fn test_display() {
        let id = capture_id(b"frame");
        let path = Path::capture(id).commands().index(3).memory(1, 0x10, 0x10);
        assert_eq!(
            path.to_string(),
            format!("{}.commands[3].memory(pool=1, 0x10..0x20)", id)
        );
        let result = Path::capture(id).commands().index(0).result();
        assert!(result.to_string().ends_with("[0].<result>"));
    }

    #[test]
    fn test_json_roundtrip() {
        let path = Path::capture(capture_id(b"frame"))
            .commands()
            .index(7)
            .resource(2);
        let json = serde_json::to_string(&path).unwrap();
        let restored: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(path, restored);
    }

    #[test]
    fn test_json_rejects_misplaced_child() {
        let blob = serde_json::to_value(Path::blob(BlobId::compute(b"data"))).unwrap();
        let json = serde_json::json!({ "commands": { "parent": blob } });
        let err = serde_json::from_value::<Path>(json).unwrap_err();
        assert!(err.to_string().contains("cannot build a commands path under a blob path"));

        // Misplaced node below a valid prefix.
        let commands = serde_json::to_value(Path::capture(capture_id(b"frame")).commands()).unwrap();
        let json = serde_json::json!({ "result": { "parent": commands } });
        assert!(serde_json::from_value::<Path>(json).is_err());
    }

    #[test]
    fn test_json_accepts_built_shape() {
        let id = capture_id(b"frame");
        let capture = serde_json::to_value(Path::capture(id)).unwrap();
        let json = serde_json::json!({
            "parameter": {
                "parent": { "command": { "parent": { "commands": { "parent": capture } }, "index": 2 } },
                "name": "mode"
            }
        });
        let path: Path = serde_json::from_value(json).unwrap();
        assert_eq!(path, Path::capture(id).commands().index(2).parameter("mode"));
    }

    #[test]
    #[should_panic(expected = "cannot build a parameter path under a capture path")]
    fn test_misplaced_child_panics() {
        let _ = Path::capture(capture_id(b"frame")).parameter("x");
    }

    fn arb_path() -> impl Strategy<Value = Path> {
        let root = any::<[u8; 4]>().prop_map(|seed| Path::capture(capture_id(&seed)));
        (root, any::<u64>(), 0u8..4, "[a-z]{1,8}", any::<u32>(), any::<u64>()).prop_map(
            |(root, index, tail, name, pool, address)| {
                let command = root.commands().index(index);
                match tail {
                    0 => command,
                    1 => command.parameter(name),
                    2 => command.memory(pool, address, 16),
                    _ => command.result(),
                }
            },
        )
    }

    proptest! {
        #[test]
        fn prop_distinct_paths_distinct_hashes(a in arb_path(), b in arb_path()) {
            prop_assume!(a != b);
            prop_assert_ne!(a.content_hash().unwrap(), b.content_hash().unwrap());
        }

        #[test]
        fn prop_equal_paths_equal_hashes(a in arb_path()) {
            let b = a.clone();
            prop_assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
        }
    }
}
