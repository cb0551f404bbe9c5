//! Error types for loading and walking source files.

use std::path::PathBuf;

/// Errors that can occur while resolving or reading source files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file does not exist, or vanished between listing and reading.
    #[error("source file not found: {}", path.display())]
    NotFound {
        /// The path that could not be found.
        path: PathBuf,
    },

    /// Any other I/O failure while resolving or reading a path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl SourceError {
    /// Classifies an I/O error, folding `NotFound` into its own variant.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Returns `true` if the error means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
