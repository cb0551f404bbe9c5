//! Discovery and parsing of per-project compiler configuration.
//!
//! A project root is searched for `xcompile.toml`, then `.compilerc`, then the
//! legacy `.babelrc` / `package.json` forms, falling back to built-in defaults.
//! The result is a [`ResolvedConfig`]: per-MIME-type compiler options plus a
//! record of where they came from.

#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod loader;
pub mod paths;
pub mod types;

pub use env::{active_env, EnvLookup, ProcessEnv};
pub use error::ConfigError;
pub use loader::{
    default_options, load_babel_config, load_compilerc, load_project_file, parse_babel_config,
    parse_compilerc, parse_project_file, resolve_project_config,
};
pub use paths::{default_cache_dir, production_cache_dir, project_cache_dir, PROJECT_CACHE_DIR};
pub use types::*;
