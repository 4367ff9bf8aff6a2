//! Finalized captures.

use crate::log::AtomLog;
use serde::{Deserialize, Serialize};
use tracelens_core::{CanonicalEncode, CaptureId, Result};

/// A finalized recorded session
///
/// The id is the content hash of the name and the log, so two captures of
/// the same commands under the same name share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    id: CaptureId,
    name: String,
    log: AtomLog,
}

impl Capture {
    /// Finalize a capture over `log`
    ///
    /// # Errors
    ///
    /// Returns [`tracelens_core::Error::InvalidEncoding`] if the log cannot be encoded
    pub fn new(name: impl Into<String>, log: AtomLog) -> Result<Self> {
        let name = name.into();
        let id = CaptureId::from_hash((&name, &log).content_hash()?);
        Ok(Self { id, name, log })
    }

    /// Content address of the capture
    #[must_use]
    pub const fn id(&self) -> CaptureId {
        self.id
    }

    /// Name given when the capture was finalized
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The recorded commands
    #[must_use]
    pub const fn log(&self) -> &AtomLog {
        &self.log
    }

    /// Summary of the capture
    #[must_use]
    pub fn header(&self) -> CaptureHeader {
        CaptureHeader {
            id: self.id,
            name: self.name.clone(),
            atom_count: self.log.len(),
            invoke_count: self.log.iter().filter(|atom| atom.is_invoke()).count() as u64,
        }
    }
}

/// Summary of a capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureHeader {
    /// Content address of the capture
    pub id: CaptureId,
    /// Capture name
    pub name: String,
    /// Number of atoms in the log
    pub atom_count: u64,
    /// Number of execution boundaries in the log
    pub invoke_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Atom, Call, INVOKE};

    fn log() -> AtomLog {
        AtomLog::new(vec![
            Atom::Call(Call::new("glClear")),
            INVOKE.clone(),
            Atom::Call(Call::new("glFlush")),
            INVOKE.clone(),
        ])
    }

    #[test]
    fn test_capture_id_is_content_addressed() {
        let a = Capture::new("frame", log()).unwrap();
        let b = Capture::new("frame", log()).unwrap();
        let c = Capture::new("other", log()).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_capture_header() {
        let capture = Capture::new("frame", log()).unwrap();
        let header = capture.header();
        assert_eq!(header.id, capture.id());
        assert_eq!(header.name, "frame");
        assert_eq!(header.atom_count, 4);
        assert_eq!(header.invoke_count, 2);
    }
}
