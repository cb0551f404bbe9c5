//! Platform-stable path identity.
//!
//! Paths handed to the compiler host may arrive with mixed separators, mixed
//! case, or through symlinks. Every path is resolved to its real location and
//! then normalized into a string key before it is used for change detection.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::SourceError;

/// Number of symlink resolutions remembered by default.
pub const DEFAULT_MEMO_CAPACITY: usize = 32;

/// A resolved, normalized path.
///
/// Identity is the normalized [`key`](Self::key): forward slashes and
/// lowercase. The resolved filesystem path is kept alongside for I/O.
#[derive(Clone)]
pub struct CanonicalPath {
    real: PathBuf,
    key: String,
}

impl CanonicalPath {
    /// Wraps an already-resolved path without touching the filesystem.
    pub fn from_resolved(real: impl Into<PathBuf>) -> Self {
        let real = real.into();
        let key = normalize_key(&real);
        Self { real, key }
    }

    /// The resolved filesystem path.
    pub fn as_path(&self) -> &Path {
        &self.real
    }

    /// The normalized identity key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the key relative to `root` when this path lies beneath it,
    /// otherwise the full key.
    pub fn key_relative_to(&self, root: &CanonicalPath) -> String {
        let prefix = root.key.trim_end_matches('/');
        match self.key.strip_prefix(prefix) {
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
            _ => self.key.clone(),
        }
    }
}

impl PartialEq for CanonicalPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CanonicalPath {}

impl Hash for CanonicalPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalPath({})", self.key)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.real.display())
    }
}

/// Resolves symlinks and normalizes paths, memoizing the resolution step.
///
/// The memo is a small LRU so that repeated requests for the same asset do
/// not hit `realpath` every time. Thread-safe.
pub struct PathCanonicalizer {
    memo: Mutex<LruCache<PathBuf, PathBuf>>,
}

impl PathCanonicalizer {
    /// Creates a canonicalizer with the default memo capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMO_CAPACITY)
    }

    /// Creates a canonicalizer remembering up to `capacity` resolutions.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolves `path` to a [`CanonicalPath`].
    ///
    /// Fails with [`SourceError::NotFound`] if the path does not exist.
    pub fn canonicalize(&self, path: &Path) -> Result<CanonicalPath, SourceError> {
        if let Some(real) = self.memo.lock().get(path) {
            return Ok(CanonicalPath::from_resolved(real.clone()));
        }

        let real = std::fs::canonicalize(path).map_err(|e| SourceError::from_io(path, e))?;
        tracing::trace!(
            path = %path.display(),
            real = %real.display(),
            "realpath memo miss"
        );
        self.memo.lock().put(path.to_path_buf(), real.clone());
        Ok(CanonicalPath::from_resolved(real))
    }

    /// Drops a memoized resolution, e.g. after a file was deleted.
    pub fn forget(&self, path: &Path) {
        self.memo.lock().pop(path);
    }

    /// Number of memoized resolutions currently held.
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }
}

impl Default for PathCanonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_key(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if c == '\\' { '/' } else { c })
        .collect::<String>()
        .to_lowercase()
}
