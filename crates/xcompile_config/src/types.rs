//! Configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Compiler options keyed by MIME type.
///
/// Values are opaque to the host: each compiler interprets its own options.
/// A `BTreeMap` keeps serialization order stable, which matters because the
/// serialized options participate in cache fingerprints.
pub type CompilerOptions = BTreeMap<String, serde_json::Value>;

/// Where a [`ResolvedConfig`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigSource {
    /// `xcompile.toml` in the project root.
    ProjectFile,
    /// `.compilerc` in the project root.
    Compilerc,
    /// `.babelrc` in the project root.
    Babelrc,
    /// The `babel` key of `package.json`.
    PackageJson,
    /// No configuration was found; built-in defaults apply.
    Defaults,
}

/// The outcome of configuration discovery for one project root.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The project root the configuration applies to.
    pub app_root: PathBuf,
    /// Which file (if any) supplied the options.
    pub source: ConfigSource,
    /// The active environment name used for `env` selection.
    pub env: String,
    /// Per-MIME-type compiler options.
    pub options: CompilerOptions,
    /// Cache directory override from `xcompile.toml`, relative to the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// The `xcompile.toml` project file.
///
/// ```toml
/// [options."application/typescript"]
/// target = "es2017"
///
/// [env.production.options."application/typescript"]
/// target = "es2017"
/// removeComments = true
///
/// [cache]
/// dir = ".cache"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct ProjectFile {
    /// Compiler options keyed by MIME type.
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
    /// Named environments whose options replace the top-level ones.
    #[serde(default)]
    pub env: BTreeMap<String, EnvSection>,
    /// Cache location settings.
    #[serde(default)]
    pub cache: CacheSection,
}

/// One `[env.<name>]` table.
#[derive(Debug, Default, Deserialize)]
pub struct EnvSection {
    /// Options used instead of the top-level `[options]` table.
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

/// The `[cache]` table.
#[derive(Debug, Default, Deserialize)]
pub struct CacheSection {
    /// Cache directory, relative to the project root.
    pub dir: Option<PathBuf>,
}
