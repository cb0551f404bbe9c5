//! Error types surfaced by the compiler host.

use std::path::PathBuf;

use xcompile_cache::CacheError;
use xcompile_common::Fingerprint;
use xcompile_compiler::{CompileError, RegistryError};
use xcompile_config::ConfigError;
use xcompile_source::SourceError;

/// Errors returned by [`CompilerHost`](crate::CompilerHost) operations.
///
/// Failures are local to one file. [`is_skippable`](Self::is_skippable)
/// tells batch callers which ones to log and move past.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No compiler is registered for the file's format.
    #[error("no compiler registered for {}", path.display())]
    UnsupportedFormat {
        /// The file that was requested.
        path: PathBuf,
    },

    /// The file does not exist, or vanished before it could be read.
    #[error("source file not found: {}", path.display())]
    NotFound {
        /// The file that was requested.
        path: PathBuf,
    },

    /// The compiler rejected the file.
    #[error(transparent)]
    CompileFailure(#[from] CompileError),

    /// A read-only host has no artifact for the file's current fingerprint.
    #[error("no prebuilt artifact for {} (fingerprint {fingerprint}); the cache was built from different sources", path.display())]
    StaleCacheMiss {
        /// The file that was requested.
        path: PathBuf,
        /// The fingerprint that was looked up.
        fingerprint: Fingerprint,
    },

    /// The host could not be set up from the supplied configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Reading or writing the cache directory failed.
    #[error(transparent)]
    Cache(CacheError),
}

impl HostError {
    /// Returns `true` for failures a batch run should log and skip.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::NotFound { .. } | Self::CompileFailure(_)
        )
    }
}

impl From<SourceError> for HostError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound { path } => Self::NotFound { path },
            other => Self::Cache(CacheError::Source(other)),
        }
    }
}

impl From<CacheError> for HostError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Source(source) => source.into(),
            other => Self::Cache(other),
        }
    }
}

impl From<ConfigError> for HostError {
    fn from(e: ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}

impl From<RegistryError> for HostError {
    fn from(e: RegistryError) -> Self {
        Self::Configuration(e.to_string())
    }
}
