//! The compiler host façade.
//!
//! A [`CompilerHost`] ties together path canonicalization, the compiler
//! registry, change detection, and the compile cache. It is constructed once
//! into one of two modes and never switches:
//!
//! - [`HostMode::Writable`] compiles on a cache miss, stores the result, and
//!   persists its configuration so a read-only host can be rebuilt from it.
//! - [`HostMode::ReadOnly`] serves only what a writable host left in the cache
//!   directory and fails with [`HostError::StaleCacheMiss`] otherwise.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use xcompile_cache::{CacheError, CacheStats, ChangeDetectionCache, CompileCache, FlushPolicy, HostSnapshot};
use xcompile_compiler::{CompileError, CompiledArtifact, Registry, RegistryBuilder};
use xcompile_source::{for_all_files, CanonicalPath, PathCanonicalizer};

use crate::error::HostError;

/// Whether a host may compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostMode {
    /// Compiles, caches, and persists.
    Writable,
    /// Serves from a prebuilt cache only.
    ReadOnly,
}

/// A file that failed during [`CompilerHost::compile_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// The file that failed.
    pub path: PathBuf,
    /// The error, rendered.
    pub message: String,
}

/// Outcome counts for [`CompilerHost::compile_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Files compiled or served from cache.
    pub compiled: usize,
    /// Files with no registered compiler, or that vanished mid-run.
    pub skipped: usize,
    /// Files that failed to compile.
    pub failed: usize,
    /// Details of each failure, sorted by path.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Total files visited.
    pub fn total(&self) -> usize {
        self.compiled + self.skipped + self.failed
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: BatchReport) {
        self.compiled += other.compiled;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.failures.extend(other.failures);
        self.failures.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

struct Inner {
    mode: HostMode,
    app_root: CanonicalPath,
    cache_dir: PathBuf,
    registry: Arc<Registry>,
    canonicalizer: PathCanonicalizer,
    changes: ChangeDetectionCache,
    cache: CompileCache,
}

/// Compiles source files through registered compilers with caching.
///
/// Cloning is cheap and every clone shares the same caches.
#[derive(Clone)]
pub struct CompilerHost {
    inner: Arc<Inner>,
}

impl CompilerHost {
    /// Creates a writable host with manual change-record flushing.
    ///
    /// The configuration snapshot is written to `cache_dir` before this
    /// returns.
    pub fn create_writable(
        app_root: &Path,
        cache_dir: &Path,
        options: BTreeMap<String, Value>,
        compilers: RegistryBuilder,
    ) -> Result<Self, HostError> {
        Self::create_writable_with_policy(app_root, cache_dir, options, compilers, FlushPolicy::Manual)
    }

    /// Creates a writable host that flushes change records per `policy`.
    pub fn create_writable_with_policy(
        app_root: &Path,
        cache_dir: &Path,
        options: BTreeMap<String, Value>,
        compilers: RegistryBuilder,
        policy: FlushPolicy,
    ) -> Result<Self, HostError> {
        let canonicalizer = PathCanonicalizer::new();
        let app_root = canonicalizer.canonicalize(app_root)?;
        let registry = compilers.build(options)?;
        std::fs::create_dir_all(cache_dir).map_err(|e| {
            HostError::Configuration(format!(
                "cannot create cache directory {}: {e}",
                cache_dir.display()
            ))
        })?;

        let changes = ChangeDetectionCache::load(cache_dir, Some(app_root.clone())).with_policy(policy);
        tracing::debug!(
            root = %app_root,
            cache_dir = %cache_dir.display(),
            formats = registry.mime_types().len(),
            known_files = changes.len(),
            "creating writable compiler host"
        );

        let host = Self {
            inner: Arc::new(Inner {
                mode: HostMode::Writable,
                app_root,
                cache_dir: cache_dir.to_path_buf(),
                registry,
                canonicalizer,
                changes,
                cache: CompileCache::new(cache_dir),
            }),
        };
        host.save_configuration_sync()?;
        Ok(host)
    }

    /// Rebuilds a host from the snapshot a writable host saved in
    /// `cache_dir`. The result never compiles and never writes.
    ///
    /// `compilers` must bind exactly the formats the snapshot lists, each to
    /// the same compiler name and version. Any other set would change the
    /// fingerprints of prebuilt artifacts, so construction fails.
    pub fn create_readonly_from_configuration(
        cache_dir: &Path,
        app_root: &Path,
        compilers: RegistryBuilder,
    ) -> Result<Self, HostError> {
        let snapshot = HostSnapshot::load(cache_dir).map_err(|e| {
            HostError::Configuration(format!("cannot load host configuration: {e}"))
        })?;

        let registry = compilers.build(snapshot.options.clone())?;
        let bindings = registry.bindings();
        for (mime, expected) in &snapshot.compilers {
            match bindings.get(mime) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return Err(HostError::Configuration(format!(
                        "snapshot expects {expected} for {mime}, but {actual} is registered"
                    )))
                }
                None => {
                    return Err(HostError::Configuration(format!(
                        "snapshot expects {expected} for {mime}, but no compiler is registered"
                    )))
                }
            }
        }
        if let Some((mime, extra)) = bindings
            .iter()
            .find(|(mime, _)| !snapshot.compilers.contains_key(*mime))
        {
            return Err(HostError::Configuration(format!(
                "{extra} is registered for {mime}, which the snapshot does not bind"
            )));
        }

        let canonicalizer = PathCanonicalizer::new();
        let app_root = canonicalizer.canonicalize(app_root)?;
        let changes = ChangeDetectionCache::load_read_only(cache_dir, Some(app_root.clone())).map_err(|e| {
            HostError::Configuration(format!("cannot load change records: {e}"))
        })?;
        tracing::debug!(
            root = %app_root,
            cache_dir = %cache_dir.display(),
            built_from = %snapshot.app_root.display(),
            "creating read-only compiler host"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                mode: HostMode::ReadOnly,
                app_root,
                cache_dir: cache_dir.to_path_buf(),
                registry,
                canonicalizer,
                changes,
                cache: CompileCache::read_only(cache_dir),
            }),
        })
    }

    /// The mode fixed at construction.
    pub fn mode(&self) -> HostMode {
        self.inner.mode
    }

    /// The canonical application root.
    pub fn app_root(&self) -> &CanonicalPath {
        &self.inner.app_root
    }

    /// The cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    /// The frozen compiler registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Compile-cache counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Compiles `path`, blocking the calling thread.
    ///
    /// Unchanged files under unchanged configuration are served from the
    /// cache without invoking their compiler.
    pub fn compile_sync(&self, path: impl AsRef<Path>) -> Result<Arc<CompiledArtifact>, HostError> {
        let inner = &self.inner;
        let requested = path.as_ref();
        let path = inner.canonicalizer.canonicalize(requested)?;

        let (mime, compiler) = inner
            .registry
            .resolve_path(path.as_path())
            .map_err(|_| HostError::UnsupportedFormat {
                path: path.as_path().to_path_buf(),
            })?;

        let fragment = inner.registry.config_fragment(mime.as_str());
        let observation = match inner.changes.observe(&path, fragment) {
            Ok(observation) => observation,
            Err(CacheError::Source(e)) if e.is_not_found() => {
                inner.canonicalizer.forget(requested);
                return Err(HostError::from(e));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::trace!(
            path = %path,
            mime = %mime,
            fingerprint = %observation.fingerprint,
            changed = observation.changed,
            "observed"
        );

        match inner.mode {
            HostMode::ReadOnly => {
                inner
                    .cache
                    .get(&observation.fingerprint)
                    .ok_or_else(|| HostError::StaleCacheMiss {
                        path: path.as_path().to_path_buf(),
                        fingerprint: observation.fingerprint,
                    })
            }
            HostMode::Writable => {
                let artifact = inner.cache.compute_and_store(
                    observation.fingerprint,
                    compiler.as_ref(),
                    &observation.unit,
                    inner.registry.options_for(mime.as_str()),
                )?;
                Ok(artifact)
            }
        }
    }

    /// Compiles `path` on the blocking thread pool.
    pub async fn compile(&self, path: impl AsRef<Path>) -> Result<Arc<CompiledArtifact>, HostError> {
        let host = self.clone();
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        tokio::task::spawn_blocking(move || host.compile_sync(&path))
            .await
            .map_err(|e| CompileError::new("xcompile", display, e.to_string()))?
    }

    /// Compiles every file under `root`, in parallel.
    ///
    /// A failing file never stops the run. Only an unreadable `root` is an
    /// error.
    pub fn compile_all(&self, root: impl AsRef<Path>) -> Result<BatchReport, HostError> {
        let root = root.as_ref();
        let compiled = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let failures = Mutex::new(Vec::new());

        let visited = for_all_files(root, |file| match self.compile_sync(file) {
            Ok(_) => {
                compiled.fetch_add(1, Ordering::Relaxed);
            }
            Err(e @ (HostError::UnsupportedFormat { .. } | HostError::NotFound { .. })) => {
                tracing::debug!(path = %file.display(), reason = %e, "skipping");
                skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "failed to compile");
                failures.lock().push(BatchFailure {
                    path: file.to_path_buf(),
                    message: e.to_string(),
                });
            }
        })?;

        let mut failures = failures.into_inner();
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        let report = BatchReport {
            compiled: compiled.into_inner(),
            skipped: skipped.into_inner(),
            failed: failures.len(),
            failures,
        };
        tracing::debug!(
            root = %root.display(),
            visited,
            compiled = report.compiled,
            skipped = report.skipped,
            failed = report.failed,
            "batch compile finished"
        );
        Ok(report)
    }

    /// Writes the configuration snapshot and flushes change records.
    pub fn save_configuration_sync(&self) -> Result<(), HostError> {
        let inner = &self.inner;
        if inner.mode == HostMode::ReadOnly {
            return Err(HostError::Cache(CacheError::ReadOnly));
        }

        let options = inner
            .registry
            .options()
            .iter()
            .map(|(mime, value)| (mime.to_string(), value.clone()))
            .collect();
        HostSnapshot::new(inner.app_root.as_path(), options, inner.registry.bindings())
            .save(&inner.cache_dir)?;
        inner.changes.flush()?;
        Ok(())
    }

    /// Async form of [`save_configuration_sync`](Self::save_configuration_sync).
    pub async fn save_configuration(&self) -> Result<(), HostError> {
        let host = self.clone();
        tokio::task::spawn_blocking(move || host.save_configuration_sync())
            .await
            .map_err(|e| HostError::Configuration(format!("saving configuration panicked: {e}")))?
    }

    /// Writes change records to disk. A no-op on a read-only host.
    pub fn flush(&self) -> Result<(), HostError> {
        self.inner.changes.flush()?;
        Ok(())
    }

    /// Deletes artifacts no change record refers to.
    ///
    /// Returns the number of artifacts removed. Fails on a read-only host.
    pub fn prune(&self) -> Result<usize, HostError> {
        let live = self.inner.changes.fingerprints();
        Ok(self.inner.cache.prune(&live)?)
    }
}

impl std::fmt::Debug for CompilerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerHost")
            .field("mode", &self.inner.mode)
            .field("app_root", &self.inner.app_root)
            .field("cache_dir", &self.inner.cache_dir)
            .finish_non_exhaustive()
    }
}
