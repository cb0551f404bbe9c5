//! Persisted host configuration.
//!
//! A writable host saves a [`HostSnapshot`] as `host-config.json` in its cache
//! directory. A read-only host is built from that snapshot alone, so the
//! snapshot must capture everything that feeds into fingerprints: the
//! per-format compiler options and which compiler (name and version) is bound
//! to each format.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CacheError;
use crate::fsutil::write_atomic;

/// Name of the snapshot file within the cache directory.
pub const HOST_CONFIG_FILE: &str = "host-config.json";

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Everything a read-only host needs to reproduce a writable host's
/// fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    /// Snapshot format version.
    pub format_version: u32,

    /// xcompile version that wrote the snapshot.
    pub xcompile_version: String,

    /// Application root the change records are relative to.
    pub app_root: PathBuf,

    /// Compiler options keyed by MIME type.
    pub options: BTreeMap<String, Value>,

    /// `name@version` of the compiler bound to each MIME type.
    pub compilers: BTreeMap<String, String>,
}

impl HostSnapshot {
    /// Creates a snapshot stamped with the current format and crate version.
    pub fn new(
        app_root: impl Into<PathBuf>,
        options: BTreeMap<String, Value>,
        compilers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            xcompile_version: env!("CARGO_PKG_VERSION").to_string(),
            app_root: app_root.into(),
            options,
            compilers,
        }
    }

    /// Path of the snapshot file for a cache directory.
    pub fn path_in(cache_dir: &Path) -> PathBuf {
        cache_dir.join(HOST_CONFIG_FILE)
    }

    /// Returns `true` if a snapshot file exists in `cache_dir`.
    pub fn exists(cache_dir: &Path) -> bool {
        Self::path_in(cache_dir).is_file()
    }

    /// Loads the snapshot from `cache_dir`.
    ///
    /// Unlike artifact reads this is not fail-safe: a missing, unparsable,
    /// or wrong-version snapshot is an error.
    pub fn load(cache_dir: &Path) -> Result<Self, CacheError> {
        let path = Self::path_in(cache_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::SnapshotMissing { path })
            }
            Err(e) => return Err(CacheError::io(path, e)),
        };

        let snapshot: Self = serde_json::from_str(&content).map_err(|e| CacheError::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path,
                expected: SNAPSHOT_FORMAT_VERSION,
                actual: snapshot.format_version,
            });
        }
        Ok(snapshot)
    }

    /// Saves the snapshot to `cache_dir`, creating the directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let path = Self::path_in(cache_dir);
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(path = %path.display(), formats = self.options.len(), "saved host configuration");
        Ok(())
    }
}
