//! JSON capture documents and configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracelens_database::DatabaseConfig;
use tracelens_log::{Atom, Capture, LogBuilder};
use tracelens_resolve::ResolveConfig;

/// Error loading a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// File is not valid JSON for the expected shape
    #[error("cannot parse {path}: {source}")]
    Json {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// Capture could not be finalized
    #[error("invalid capture: {0}")]
    Capture(#[from] tracelens_core::Error),
}

/// A capture written out as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDocument {
    /// Capture name
    pub name: String,
    /// Recorded commands in order
    #[serde(default)]
    pub atoms: Vec<Atom>,
}

impl CaptureDocument {
    /// Finalize the document into a capture
    ///
    /// # Errors
    ///
    /// Returns an error if the capture cannot be encoded
    pub fn into_capture(self) -> Result<Capture, DocumentError> {
        let mut builder = LogBuilder::new();
        for atom in self.atoms {
            builder.push(atom);
        }
        Ok(Capture::new(self.name, builder.finalize())?)
    }
}

/// Settings read from `--config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Cache settings
    pub database: DatabaseConfig,
    /// Resolver settings
    pub resolve: ResolveConfig,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DocumentError> {
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DocumentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and finalize a capture document
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_capture(path: &Path) -> Result<Capture, DocumentError> {
    let document: CaptureDocument = read_json(path)?;
    tracing::debug!(path = %path.display(), atoms = document.atoms.len(), "capture document loaded");
    document.into_capture()
}

/// Load a configuration file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_config(path: &Path) -> Result<CliConfig, DocumentError> {
    read_json(path)
}
