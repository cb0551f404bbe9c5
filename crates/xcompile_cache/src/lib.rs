//! Fingerprint-addressed compile cache.
//!
//! This crate stores compiled artifacts on disk keyed by [`Fingerprint`](xcompile_common::Fingerprint),
//! tracks which files changed since they were last observed, guarantees that
//! at most one compilation runs per fingerprint at a time, and persists the
//! host configuration snapshot that read-only deployments start from.

#![warn(missing_docs)]

pub mod artifact;
pub mod changes;
pub mod compile_cache;
pub mod error;
mod fsutil;
mod inflight;
pub mod snapshot;

pub use artifact::ArtifactStore;
pub use changes::{ChangeDetectionCache, FlushPolicy, Observation};
pub use compile_cache::{CacheStats, CompileCache};
pub use error::CacheError;
pub use snapshot::HostSnapshot;
