//! Resolution context.
//!
//! A context is an immutable value passed down every call. Binding a
//! capture or a cancellation token produces a new context; the caller's
//! context is never changed.

use crate::database::Database;
use crate::resolvable::Resolvable;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracelens_core::{CaptureId, Error, Fingerprint, Result};
use tracelens_log::Capture;

/// Context handed to [`Database::build`] and to resolvers
pub struct Context<R: Resolvable> {
    database: Database<R>,
    capture: Option<CaptureId>,
    cancel: CancellationToken,
    /// Fingerprint of the resolution running under this context
    frame: Option<Fingerprint>,
}

impl<R: Resolvable> Context<R> {
    /// Root context for `database`, with no capture bound
    #[must_use]
    pub fn new(database: Database<R>) -> Self {
        Self {
            database,
            capture: None,
            cancel: CancellationToken::new(),
            frame: None,
        }
    }

    /// The database this context resolves against
    #[must_use]
    pub fn database(&self) -> &Database<R> {
        &self.database
    }

    /// Services injected into the database
    #[must_use]
    pub fn env(&self) -> &R::Env {
        self.database.env()
    }

    /// Id of the bound capture, if any
    #[must_use]
    pub fn capture_id(&self) -> Option<CaptureId> {
        self.capture
    }

    /// Derive a context bound to `capture`, shadowing any outer binding
    #[must_use]
    pub fn with_capture(&self, capture: CaptureId) -> Self {
        Self {
            capture: Some(capture),
            ..self.clone()
        }
    }

    /// The bound capture
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotBound`] if no capture is bound or the bound
    /// capture is not registered
    pub fn capture(&self) -> Result<Arc<Capture>> {
        let id = self.capture.ok_or_else(|| Error::CaptureNotBound {
            address: "context".to_string(),
        })?;
        self.database.capture(&id)
    }

    /// Derive a context canceled by `token`
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    /// Token that cancels waits made under this context
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether waits under this context have been canceled
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if this context has been canceled
    ///
    /// # Errors
    ///
    /// Returns [`Error::Canceled`] if this context has been canceled
    pub fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }

    /// Fingerprint of the resolution running under this context
    #[must_use]
    pub fn frame(&self) -> Option<Fingerprint> {
        self.frame
    }

    /// Context for the resolution of `frame`
    ///
    /// Keeps the capture binding; the caller's cancellation is replaced so
    /// that a canceled caller does not cancel the shared computation.
    pub(crate) fn for_resolution(&self, frame: Fingerprint, cancel: CancellationToken) -> Self {
        Self {
            database: self.database.clone(),
            capture: self.capture,
            cancel,
            frame: Some(frame),
        }
    }

    /// Resolve `resolvable` through the database
    ///
    /// # Errors
    ///
    /// See [`Database::build`]
    pub async fn build(&self, resolvable: R) -> Result<R::Value> {
        self.database.build(self, resolvable).await
    }
}

impl<R: Resolvable> Clone for Context<R> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            capture: self.capture,
            cancel: self.cancel.clone(),
            frame: self.frame,
        }
    }
}

impl<R: Resolvable> std::fmt::Debug for Context<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("capture", &self.capture)
            .field("canceled", &self.is_canceled())
            .field("frame", &self.frame)
            .finish()
    }
}
