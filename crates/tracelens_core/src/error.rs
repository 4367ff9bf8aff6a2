//! Error type shared by the log, path, database and resolver layers.

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// Errors are `Clone` because a failed resolution is cached and handed to
/// every caller waiting on the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The address does not resolve to anything in the capture
    #[error("Address not found: {address}")]
    AddressNotFound {
        /// Rendered address
        address: String,
    },

    /// The address has no owning capture, or its capture is not registered
    #[error("No capture bound for {address}")]
    CaptureNotBound {
        /// Rendered address
        address: String,
    },

    /// An index is past the end of a sequence
    #[error("{what} index {index} out of range (length {len})")]
    OutOfRange {
        /// What was being indexed
        what: String,
        /// Requested index
        index: u64,
        /// Length of the sequence
        len: u64,
    },

    /// A resolved value is not of the kind the caller expected
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected value kind
        expected: String,
        /// Actual value kind
        actual: String,
    },

    /// A nested resolution failed
    #[error("Dependency {dependency} failed: {source}")]
    DependencyFailed {
        /// Description of the failed dependency
        dependency: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// An atom log traversal handler returned failure
    #[error("Handler aborted at atom {index}: {source}")]
    HandlerAborted {
        /// Index of the atom the handler failed on
        index: u64,
        /// Handler failure
        source: Box<Error>,
    },

    /// The caller's context was canceled while waiting
    #[error("Operation canceled")]
    Canceled,

    /// A resolution would wait on itself
    #[error("Dependency cycle detected: {}", chain.join(" -> "))]
    Cycle {
        /// Fingerprints along the cycle, first and last equal
        chain: Vec<String>,
    },

    /// Blob exceeds the configured size limit
    #[error("Blob too large: {size} bytes (limit: {limit})")]
    BlobTooLarge {
        /// Blob size
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// Canonical encoding failed
    #[error("Invalid encoding: {reason}")]
    InvalidEncoding {
        /// Encoder message
        reason: String,
    },

    /// The replay backend failed to materialize a value
    #[error("Replay failed: {reason}")]
    Replay {
        /// Backend message
        reason: String,
    },

    /// Internal error (for unexpected errors)
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Wrap a failure of the named dependency
    #[must_use]
    pub fn dependency(dependency: impl Into<String>, source: Error) -> Self {
        Self::DependencyFailed {
            dependency: dependency.into(),
            source: Box::new(source),
        }
    }

    /// Shorthand for [`Error::AddressNotFound`]
    #[must_use]
    pub fn not_found(address: impl std::fmt::Display) -> Self {
        Self::AddressNotFound {
            address: address.to_string(),
        }
    }

    /// Shorthand for [`Error::TypeMismatch`]
    #[must_use]
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// The innermost error of a wrapped chain
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        let mut err = self;
        while let Self::DependencyFailed { source, .. } | Self::HandlerAborted { source, .. } = err {
            err = &**source;
        }
        err
    }

    /// Whether the failure depends on state outside the request: who was
    /// waiting, or which captures were registered at the time. Transient
    /// failures are never cached.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Canceled | Self::Cycle { .. } | Self::CaptureNotBound { .. }
        )
    }
}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Self::InvalidEncoding {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("capture<abc>.commands[9]");
        assert_eq!(err.to_string(), "Address not found: capture<abc>.commands[9]");

        let err = Error::OutOfRange {
            what: "command".to_string(),
            index: 9,
            len: 3,
        };
        assert_eq!(err.to_string(), "command index 9 out of range (length 3)");
    }

    #[test]
    fn test_cycle_display() {
        let err = Error::Cycle {
            chain: vec!["fp_a".to_string(), "fp_b".to_string(), "fp_a".to_string()],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected: fp_a -> fp_b -> fp_a");
    }

    #[test]
    fn test_root_cause() {
        let inner = Error::not_found("x");
        let err = Error::dependency("get y", Error::dependency("get x", inner.clone()));
        assert_eq!(err.root_cause(), &inner);
        assert!(err.to_string().contains("get y"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;
        let err = Error::HandlerAborted {
            index: 2,
            source: Box::new(Error::Canceled),
        };
        assert_eq!(err.source().map(ToString::to_string), Some("Operation canceled".to_string()));
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::Canceled.is_transient());
        assert!(Error::dependency("snapshot", Error::Canceled).is_transient());
        assert!(Error::Cycle { chain: Vec::new() }.is_transient());
        let unregistered = Error::CaptureNotBound {
            address: "capture<abc>".to_string(),
        };
        assert!(Error::dependency("boundaries", unregistered).is_transient());
        assert!(!Error::not_found("x").is_transient());
        assert!(!Error::dependency("get x", Error::not_found("x")).is_transient());
    }
}
