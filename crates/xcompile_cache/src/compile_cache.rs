//! The fingerprint-keyed compile cache.
//!
//! [`CompileCache`] layers an in-memory map over the [`ArtifactStore`] and
//! ensures that, for any fingerprint, at most one compilation runs at a time
//! within the process. Concurrent callers for a fingerprint that is already
//! being compiled wait for and share that single outcome, including failures.
//! Failures are never stored, so the next request after one retries.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use xcompile_common::Fingerprint;
use xcompile_compiler::{CompileError, CompiledArtifact, Compiler};
use xcompile_source::CompilationUnit;

use crate::artifact::ArtifactStore;
use crate::error::CacheError;
use crate::inflight::{Claim, InFlight};

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory or disk.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Compilations run.
    pub compiles: u64,
    /// Compilations that failed.
    pub failures: u64,
    /// Callers that waited on another caller's compilation.
    pub coalesced: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
    failures: AtomicU64,
    coalesced: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Compiled artifacts by fingerprint, backed by disk.
pub struct CompileCache {
    store: ArtifactStore,
    memory: DashMap<Fingerprint, Arc<CompiledArtifact>>,
    inflight: InFlight,
    read_only: bool,
    counters: Counters,
}

impl CompileCache {
    /// Creates a writable cache under `cache_dir`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            store: ArtifactStore::new(cache_dir),
            memory: DashMap::new(),
            inflight: InFlight::default(),
            read_only: false,
            counters: Counters::default(),
        }
    }

    /// Creates a cache that serves existing artifacts and never compiles.
    pub fn read_only(cache_dir: &Path) -> Self {
        Self {
            read_only: true,
            ..Self::new(cache_dir)
        }
    }

    /// Whether this cache refuses to compile or delete.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The backing artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Looks up an artifact, loading it from disk into memory on first use.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CompiledArtifact>> {
        if let Some(found) = self.memory.get(fingerprint).map(|r| Arc::clone(r.value())) {
            bump(&self.counters.hits);
            return Some(found);
        }

        match self.store.read(fingerprint) {
            Some(artifact) => {
                let artifact = Arc::new(artifact);
                self.memory.insert(*fingerprint, Arc::clone(&artifact));
                bump(&self.counters.hits);
                Some(artifact)
            }
            None => {
                bump(&self.counters.misses);
                None
            }
        }
    }

    /// Returns the artifact for `fingerprint`, compiling `unit` with
    /// `compiler` if nothing is cached.
    pub fn compute_and_store(
        &self,
        fingerprint: Fingerprint,
        compiler: &dyn Compiler,
        unit: &CompilationUnit,
        options: &Value,
    ) -> Result<Arc<CompiledArtifact>, CompileError> {
        self.get_or_compute(fingerprint, || compiler.compile(unit, options))
    }

    /// Returns the artifact for `fingerprint`, running `compile` if nothing
    /// is cached and no other caller is already compiling it.
    pub fn get_or_compute<F>(&self, fingerprint: Fingerprint, compile: F) -> Result<Arc<CompiledArtifact>, CompileError>
    where
        F: FnOnce() -> Result<CompiledArtifact, CompileError>,
    {
        if let Some(found) = self.get(&fingerprint) {
            return Ok(found);
        }
        if self.read_only {
            return Err(CompileError::new(
                "xcompile",
                fingerprint.to_string(),
                "read-only cache cannot compile",
            ));
        }

        let leader = match self.inflight.claim(fingerprint) {
            Claim::Follower(flight) => {
                bump(&self.counters.coalesced);
                tracing::debug!(%fingerprint, "waiting on in-flight compilation");
                return flight.wait();
            }
            Claim::Leader(leader) => leader,
        };

        // A previous leader may have finished between the lookup and the claim.
        if let Some(found) = self.memory.get(&fingerprint).map(|r| Arc::clone(r.value())) {
            leader.finish(Ok(Arc::clone(&found)));
            return Ok(found);
        }

        bump(&self.counters.compiles);
        let outcome = compile().map(Arc::new);
        match &outcome {
            Ok(artifact) => {
                self.memory.insert(fingerprint, Arc::clone(artifact));
                if let Err(e) = self.store.write(&fingerprint, artifact) {
                    tracing::warn!(%fingerprint, error = %e, "failed to persist artifact");
                }
            }
            Err(e) => {
                bump(&self.counters.failures);
                tracing::debug!(%fingerprint, error = %e, "compilation failed");
            }
        }
        leader.finish(outcome.clone());
        outcome
    }

    /// Drops in-memory and on-disk artifacts not in `live`.
    ///
    /// Returns the number of files deleted.
    pub fn prune(&self, live: &HashSet<Fingerprint>) -> Result<usize, CacheError> {
        if self.read_only {
            return Err(CacheError::ReadOnly);
        }
        self.memory.retain(|fp, _| live.contains(fp));
        let removed = self.store.prune(live)?;
        tracing::debug!(removed, kept = live.len(), "pruned artifacts");
        Ok(removed)
    }

    /// Current counter values.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            compiles: self.counters.compiles.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Number of compilations currently running.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}
