//! Configuration file discovery and parsing.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use xcompile_common::MimeType;

use crate::env::{active_env, EnvLookup, BABEL_ENV_VARS, COMPILE_ENV_VARS};
use crate::error::ConfigError;
use crate::types::{CompilerOptions, ConfigSource, ProjectFile, ResolvedConfig};

/// Project configuration file name.
pub const PROJECT_FILE: &str = "xcompile.toml";
/// JSON configuration file name.
pub const COMPILERC_FILE: &str = ".compilerc";
/// Legacy Babel configuration file name.
pub const BABELRC_FILE: &str = ".babelrc";
/// npm manifest, consulted for a `babel` key.
pub const PACKAGE_JSON_FILE: &str = "package.json";

/// Resolves the compiler configuration for a project root.
///
/// The first file found wins: `xcompile.toml`, `.compilerc`, `.babelrc`,
/// then the `babel` key of `package.json`. With none of them present the
/// built-in [`default_options`] apply.
pub fn resolve_project_config(
    app_root: &Path,
    env: &dyn EnvLookup,
) -> Result<ResolvedConfig, ConfigError> {
    let project_file = app_root.join(PROJECT_FILE);
    if project_file.is_file() {
        tracing::debug!(path = %project_file.display(), "using project file");
        return load_project_file(&project_file, env);
    }

    let compilerc = app_root.join(COMPILERC_FILE);
    if compilerc.is_file() {
        tracing::debug!(path = %compilerc.display(), "using .compilerc");
        return load_compilerc(&compilerc, env);
    }

    let babelrc = app_root.join(BABELRC_FILE);
    if babelrc.is_file() {
        tracing::debug!(path = %babelrc.display(), "using .babelrc");
        return load_babel_config(&babelrc, env);
    }

    let package_json = app_root.join(PACKAGE_JSON_FILE);
    if package_json.is_file() {
        tracing::debug!(path = %package_json.display(), "checking package.json for babel settings");
        return load_babel_config(&package_json, env);
    }

    tracing::debug!(root = %app_root.display(), "no configuration found, using defaults");
    Ok(ResolvedConfig {
        app_root: app_root.to_path_buf(),
        source: ConfigSource::Defaults,
        env: active_env(env, COMPILE_ENV_VARS),
        options: default_options(),
        cache_dir: None,
    })
}

/// Loads `xcompile.toml`.
pub fn load_project_file(path: &Path, env: &dyn EnvLookup) -> Result<ResolvedConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_project_file(&content, env)?;
    config.app_root = parent_dir(path);
    Ok(config)
}

/// Parses the content of an `xcompile.toml`.
///
/// When the file has an `[env.<active>]` table its options replace the
/// top-level `[options]`. An `env` table that lacks the active environment
/// yields no options at all.
pub fn parse_project_file(content: &str, env: &dyn EnvLookup) -> Result<ResolvedConfig, ConfigError> {
    let file: ProjectFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("{PROJECT_FILE}: {e}")))?;
    let active = active_env(env, COMPILE_ENV_VARS);

    let raw = if file.env.is_empty() {
        file.options
    } else {
        match file.env.into_iter().find(|(name, _)| *name == active) {
            Some((_, section)) => section.options,
            None => {
                tracing::warn!(env = %active, "no [env] section for active environment");
                Default::default()
            }
        }
    };

    let mut options = CompilerOptions::new();
    for (mime, value) in raw {
        let value = serde_json::to_value(&value)
            .map_err(|e| ConfigError::ValidationError(format!("options for {mime}: {e}")))?;
        options.insert(normalize_mime(&mime)?, value);
    }

    Ok(ResolvedConfig {
        app_root: PathBuf::new(),
        source: ConfigSource::ProjectFile,
        env: active,
        options,
        cache_dir: file.cache.dir,
    })
}

/// Loads a `.compilerc`.
pub fn load_compilerc(path: &Path, env: &dyn EnvLookup) -> Result<ResolvedConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_compilerc(&content, env)?;
    config.app_root = parent_dir(path);
    Ok(config)
}

/// Parses the content of a `.compilerc`: a JSON object mapping MIME type to
/// options, optionally wrapped in an `env` object keyed by environment name.
pub fn parse_compilerc(content: &str, env: &dyn EnvLookup) -> Result<ResolvedConfig, ConfigError> {
    let info: Value = serde_json::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("{COMPILERC_FILE}: {e}")))?;
    let active = active_env(env, COMPILE_ENV_VARS);
    let info = select_env(expect_object(info, COMPILERC_FILE)?, &active)?;

    let mut options = CompilerOptions::new();
    for (mime, value) in info {
        options.insert(normalize_mime(&mime)?, value);
    }

    Ok(ResolvedConfig {
        app_root: PathBuf::new(),
        source: ConfigSource::Compilerc,
        env: active,
        options,
        cache_dir: None,
    })
}

/// Loads Babel settings from a `.babelrc` or `package.json`.
pub fn load_babel_config(path: &Path, env: &dyn EnvLookup) -> Result<ResolvedConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or(BABELRC_FILE);
    let info: Value =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{name}: {e}")))?;
    let is_package = name == PACKAGE_JSON_FILE;
    let mut config = parse_babel_config(info, is_package, env)?;
    config.app_root = parent_dir(path);
    Ok(config)
}

/// Interprets a legacy Babel configuration value.
///
/// The settings become the options for `application/javascript`. For a
/// `package.json` only the `babel` key is considered; without one the
/// built-in defaults apply.
pub fn parse_babel_config(
    info: Value,
    is_package_json: bool,
    env: &dyn EnvLookup,
) -> Result<ResolvedConfig, ConfigError> {
    let active = active_env(env, BABEL_ENV_VARS);
    let mut info = expect_object(info, BABELRC_FILE)?;

    let source = if is_package_json {
        match info.remove("babel") {
            Some(babel) => {
                info = expect_object(babel, "package.json#babel")?;
                ConfigSource::PackageJson
            }
            None => {
                return Ok(ResolvedConfig {
                    app_root: PathBuf::new(),
                    source: ConfigSource::Defaults,
                    env: active,
                    options: default_options(),
                    cache_dir: None,
                });
            }
        }
    } else {
        ConfigSource::Babelrc
    };

    let info = select_env(info, &active)?;
    let mut options = CompilerOptions::new();
    options.insert(MimeType::JAVASCRIPT.to_string(), Value::Object(info));

    Ok(ResolvedConfig {
        app_root: PathBuf::new(),
        source,
        env: active,
        options,
        cache_dir: None,
    })
}

/// Built-in options used when a project carries no configuration.
pub fn default_options() -> CompilerOptions {
    let mut options = CompilerOptions::new();
    options.insert(
        MimeType::JAVASCRIPT.to_string(),
        json!({
            "presets": ["es2015"],
            "sourceMaps": "inline"
        }),
    );
    options
}

/// Replaces `info` with `info.env[active]` when an `env` key is present.
fn select_env(mut info: Map<String, Value>, active: &str) -> Result<Map<String, Value>, ConfigError> {
    let Some(envs) = info.remove("env") else {
        return Ok(info);
    };
    let mut envs = expect_object(envs, "env")?;
    match envs.remove(active) {
        Some(selected) => expect_object(selected, &format!("env.{active}")),
        None => {
            tracing::warn!(env = %active, "no env entry for active environment");
            Ok(Map::new())
        }
    }
}

fn expect_object(value: Value, what: &str) -> Result<Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::ValidationError(format!(
            "{what}: expected an object, found {}",
            json_kind(&other)
        ))),
    }
}

fn normalize_mime(mime: &str) -> Result<String, ConfigError> {
    let normalized = MimeType::new(mime);
    if !normalized.as_str().contains('/') {
        return Err(ConfigError::ValidationError(format!(
            "'{mime}' is not a MIME type (expected e.g. \"application/typescript\")"
        )));
    }
    Ok(normalized.as_str().to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
