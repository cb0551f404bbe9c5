//! Well-known cache locations.

use std::path::{Path, PathBuf};

use xcompile_common::ContentHash;

use crate::types::ResolvedConfig;

/// Name of the per-project cache directory used for production snapshots.
pub const PROJECT_CACHE_DIR: &str = ".cache";

/// The development cache directory used when the caller does not supply one.
///
/// Lives under the system temp directory and is keyed by the running
/// executable, so different toolchain builds never share a cache.
pub fn default_cache_dir() -> PathBuf {
    let exe = std::env::current_exe()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "xcompile".to_string());
    let hash = ContentHash::from_bytes(exe.as_bytes());
    std::env::temp_dir().join(format!("compileCache_{hash}"))
}

/// The cache directory for a project: `[cache] dir` from `xcompile.toml`
/// when set, otherwise `<app_root>/.cache`.
pub fn project_cache_dir(config: &ResolvedConfig) -> PathBuf {
    match &config.cache_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => config.app_root.join(dir),
        None => config.app_root.join(PROJECT_CACHE_DIR),
    }
}

/// Returns `<app_root>/.cache`.
pub fn production_cache_dir(app_root: &Path) -> PathBuf {
    app_root.join(PROJECT_CACHE_DIR)
}
