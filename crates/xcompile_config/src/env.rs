//! Selection of the active configuration environment.

/// Variables consulted, in order, when picking an `env` section of
/// `xcompile.toml` or `.compilerc`.
pub const COMPILE_ENV_VARS: &[&str] = &["XCOMPILE_ENV", "NODE_ENV"];

/// Variables consulted, in order, when picking an `env` section of a
/// legacy Babel configuration.
pub const BABEL_ENV_VARS: &[&str] = &["BABEL_ENV", "NODE_ENV"];

/// Environment used when none of the variables are set.
pub const DEFAULT_ENV: &str = "development";

/// Source of environment variables.
///
/// Implemented for the real process environment and for closures, so tests
/// can supply variables without mutating global state.
pub trait EnvLookup {
    /// Returns the value of `name`, if set.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Returns the first non-empty value among `vars`, or [`DEFAULT_ENV`].
pub fn active_env(env: &dyn EnvLookup, vars: &[&str]) -> String {
    vars.iter()
        .filter_map(|name| env.var(name))
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}
