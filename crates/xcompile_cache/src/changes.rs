//! Per-file change detection.
//!
//! The change-detection cache remembers the fingerprint each file had the
//! last time it was observed. Records are keyed by the file's canonical key
//! relative to the application root, so a cache directory copied to another
//! machine still matches the same files.
//!
//! Files are always read in full when observed. Modification times are not
//! consulted: two edits inside one timestamp tick would otherwise go unseen.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use xcompile_common::Fingerprint;
use xcompile_source::{CanonicalPath, CompilationUnit};

use crate::error::CacheError;
use crate::fsutil::write_atomic;

/// Name of the change-record file within the cache directory.
pub const CHANGES_FILE: &str = "file-changes.json";

const CHANGES_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ChangeRecords {
    version: u32,
    records: BTreeMap<String, Fingerprint>,
}

/// When observed changes are written back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Only on an explicit [`ChangeDetectionCache::flush`].
    #[default]
    Manual,
    /// After every `n` recorded changes.
    EveryN(usize),
}

/// The result of observing a file.
#[derive(Debug)]
pub struct Observation {
    /// The file's fingerprint under the supplied configuration fragment.
    pub fingerprint: Fingerprint,
    /// Whether the fingerprint differs from the previously recorded one.
    /// Always `true` for a file never seen before.
    pub changed: bool,
    /// The unit that was read, ready to hand to a compiler.
    pub unit: CompilationUnit,
}

/// Tracks the last-observed fingerprint of every file.
///
/// Updates for one path are atomic; concurrent observers of the same file
/// never see a torn record. A read-only cache compares against its loaded
/// records but never records or writes anything.
pub struct ChangeDetectionCache {
    file: PathBuf,
    root: Option<CanonicalPath>,
    records: DashMap<String, Fingerprint>,
    read_only: bool,
    policy: FlushPolicy,
    pending: AtomicUsize,
    flush_lock: Mutex<()>,
}

impl ChangeDetectionCache {
    /// Creates an empty, writable cache persisting to `cache_dir`.
    pub fn new(cache_dir: &Path, root: Option<CanonicalPath>) -> Self {
        Self {
            file: cache_dir.join(CHANGES_FILE),
            root,
            records: DashMap::new(),
            read_only: false,
            policy: FlushPolicy::Manual,
            pending: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
        }
    }

    /// Sets the flush policy.
    pub fn with_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Loads a writable cache from `cache_dir`.
    ///
    /// A missing, unparsable, or outdated record file yields an empty cache:
    /// every file then counts as changed on first observation.
    pub fn load(cache_dir: &Path, root: Option<CanonicalPath>) -> Self {
        let mut cache = Self::new(cache_dir, root);
        match read_records(&cache.file) {
            Ok(Some(records)) => cache.records.extend(records),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable change records"),
        }
        cache
    }

    /// Loads a read-only cache from `cache_dir`.
    ///
    /// A missing record file yields an empty cache. A corrupt one is an error.
    pub fn load_read_only(cache_dir: &Path, root: Option<CanonicalPath>) -> Result<Self, CacheError> {
        let mut cache = Self::new(cache_dir, root);
        cache.read_only = true;
        if let Some(records) = read_records(&cache.file)? {
            cache.records.extend(records);
        }
        Ok(cache)
    }

    /// Whether this cache refuses to record or write.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Path of the backing record file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Number of recorded files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reads `path`, fingerprints it under `config_fragment`, and records the
    /// result.
    pub fn observe(&self, path: &CanonicalPath, config_fragment: &[u8]) -> Result<Observation, CacheError> {
        let unit = CompilationUnit::load(path.clone())?;
        let fingerprint = Fingerprint::new(&unit.content_hash(), config_fragment);
        let key = self.key(path);

        let changed = if self.read_only {
            self.records.get(&key).map_or(true, |r| *r.value() != fingerprint)
        } else {
            let previous = self.records.insert(key, fingerprint);
            previous != Some(fingerprint)
        };

        if changed && !self.read_only {
            self.note_change();
        }
        Ok(Observation {
            fingerprint,
            changed,
            unit,
        })
    }

    /// Reports whether `path` differs from its recorded fingerprint, without
    /// recording anything.
    pub fn has_changed(&self, path: &CanonicalPath, config_fragment: &[u8]) -> Result<bool, CacheError> {
        let unit = CompilationUnit::load(path.clone())?;
        let fingerprint = Fingerprint::new(&unit.content_hash(), config_fragment);
        Ok(self
            .records
            .get(&self.key(path))
            .map_or(true, |r| *r.value() != fingerprint))
    }

    /// The recorded fingerprint of `path`, if any.
    pub fn get(&self, path: &CanonicalPath) -> Option<Fingerprint> {
        self.records.get(&self.key(path)).map(|r| *r.value())
    }

    /// Forgets `path`, so its next observation counts as a change.
    pub fn invalidate(&self, path: &CanonicalPath) {
        if self.read_only {
            return;
        }
        if self.records.remove(&self.key(path)).is_some() {
            self.note_change();
        }
    }

    /// Every recorded fingerprint.
    pub fn fingerprints(&self) -> HashSet<Fingerprint> {
        self.records.iter().map(|r| *r.value()).collect()
    }

    /// Writes the records to disk. A no-op for read-only caches.
    pub fn flush(&self) -> Result<(), CacheError> {
        if self.read_only {
            tracing::debug!("read-only change records, skipping flush");
            return Ok(());
        }

        let _guard = self.flush_lock.lock();
        let records: BTreeMap<String, Fingerprint> = self
            .records
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        let count = records.len();
        let content = serde_json::to_string_pretty(&ChangeRecords {
            version: CHANGES_FORMAT_VERSION,
            records,
        })
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

        write_atomic(&self.file, content.as_bytes())?;
        self.pending.store(0, Ordering::Release);
        tracing::debug!(file = %self.file.display(), records = count, "flushed change records");
        Ok(())
    }

    fn key(&self, path: &CanonicalPath) -> String {
        match &self.root {
            Some(root) => path.key_relative_to(root),
            None => path.key().to_string(),
        }
    }

    fn note_change(&self) {
        let FlushPolicy::EveryN(n) = self.policy else {
            return;
        };
        let pending = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        if pending >= n.max(1) {
            if let Err(e) = self.flush() {
                tracing::warn!(error = %e, "failed to flush change records");
            }
        }
    }
}

fn read_records(file: &Path) -> Result<Option<BTreeMap<String, Fingerprint>>, CacheError> {
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(file, e)),
    };
    let parsed: ChangeRecords = serde_json::from_str(&content).map_err(|e| CacheError::Parse {
        path: file.to_path_buf(),
        reason: e.to_string(),
    })?;
    if parsed.version != CHANGES_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: file.to_path_buf(),
            expected: CHANGES_FORMAT_VERSION,
            actual: parsed.version,
        });
    }
    Ok(Some(parsed.records))
}
