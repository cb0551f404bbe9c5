//! Tracing subscriber setup.

use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::GlobalArgs;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "XCOMPILE_LOG";

/// Picks the default directive from the global flags.
///
/// `--quiet` wins over `--verbose`.
pub fn default_directive(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs a stderr `fmt` subscriber filtered by `XCOMPILE_LOG`, falling
/// back to the level implied by the global flags.
pub fn init(global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_directive(global)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(global.verbose),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs { quiet, verbose }
    }

    #[test]
    fn directive_follows_flags() {
        assert_eq!(default_directive(&global(false, false)), "warn");
        assert_eq!(default_directive(&global(false, true)), "debug");
        assert_eq!(default_directive(&global(true, false)), "error");
        assert_eq!(default_directive(&global(true, true)), "error");
    }
}
