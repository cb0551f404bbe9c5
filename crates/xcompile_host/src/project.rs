//! Host construction from a project directory.
//!
//! These helpers sit at the application boundary: they read the project's
//! configuration files and pick a cache directory, then hand explicit values
//! to the [`CompilerHost`] constructors. Nothing here runs implicitly.

use std::path::Path;

use xcompile_cache::HostSnapshot;
use xcompile_compiler::RegistryBuilder;
use xcompile_config::{
    default_cache_dir, production_cache_dir, resolve_project_config, EnvLookup, ProcessEnv,
};

use crate::error::HostError;
use crate::host::CompilerHost;

/// Returns `true` when `<app_root>/.cache` holds a saved host configuration,
/// i.e. the project was prebuilt for read-only serving.
pub fn detect_production_mode(app_root: &Path) -> bool {
    HostSnapshot::exists(&production_cache_dir(app_root))
}

/// Creates a writable host from the configuration found in `app_root`.
pub fn create_host_from_project_root(
    app_root: &Path,
    cache_dir: &Path,
    compilers: RegistryBuilder,
) -> Result<CompilerHost, HostError> {
    create_host_from_project_root_with_env(app_root, cache_dir, compilers, &ProcessEnv)
}

/// As [`create_host_from_project_root`], reading environment variables
/// through `env`.
pub fn create_host_from_project_root_with_env(
    app_root: &Path,
    cache_dir: &Path,
    compilers: RegistryBuilder,
    env: &dyn EnvLookup,
) -> Result<CompilerHost, HostError> {
    let config = resolve_project_config(app_root, env)?;
    tracing::debug!(
        root = %app_root.display(),
        source = ?config.source,
        env = %config.env,
        "resolved project configuration"
    );
    CompilerHost::create_writable(app_root, cache_dir, config.options, compilers)
}

/// Sets up a host for `app_root`.
///
/// With `production` unset the mode comes from [`detect_production_mode`].
/// Production hosts are read-only over `<app_root>/.cache`. Development
/// hosts are writable; they use the `[cache] dir` from `xcompile.toml` when
/// present and a per-toolchain temp directory otherwise.
pub fn init(
    app_root: &Path,
    production: Option<bool>,
    compilers: RegistryBuilder,
) -> Result<CompilerHost, HostError> {
    let production = production.unwrap_or_else(|| detect_production_mode(app_root));
    if production {
        tracing::debug!(root = %app_root.display(), "initializing read-only host");
        return CompilerHost::create_readonly_from_configuration(
            &production_cache_dir(app_root),
            app_root,
            compilers,
        );
    }

    let config = resolve_project_config(app_root, &ProcessEnv)?;
    let cache_dir = match &config.cache_dir {
        Some(_) => xcompile_config::project_cache_dir(&config),
        None => default_cache_dir(),
    };
    tracing::debug!(
        root = %app_root.display(),
        cache_dir = %cache_dir.display(),
        "initializing writable host"
    );
    CompilerHost::create_writable(app_root, &cache_dir, config.options, compilers)
}
