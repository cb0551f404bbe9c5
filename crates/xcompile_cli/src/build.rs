//! `xcompile build`: ahead-of-time compilation.
//!
//! 1. Wipe and recreate `<appdir>/.cache`
//! 2. Build a writable host from the project's configuration
//! 3. Compile every file under each requested path
//! 4. Save the host configuration so a read-only host can be rebuilt

use std::fs;

use xcompile_config::production_cache_dir;
use xcompile_host::{create_host_from_project_root, BatchReport};

use crate::{compilers, BuildArgs, GlobalArgs};

/// Runs the `xcompile build` command.
///
/// Per-file failures are reported and the run continues. Returns exit code
/// 0 once the configuration is saved.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    if !args.appdir.is_dir() {
        return Err(format!("application directory {} does not exist", args.appdir.display()).into());
    }

    let cache_dir = production_cache_dir(&args.appdir);
    if cache_dir.exists() {
        tracing::debug!(cache_dir = %cache_dir.display(), "removing previous cache");
        fs::remove_dir_all(&cache_dir)?;
    }
    fs::create_dir_all(&cache_dir)?;

    let host = create_host_from_project_root(&args.appdir, &cache_dir, compilers::builtin())?;

    let mut report = BatchReport::default();
    for path in &args.paths {
        if !global.quiet {
            eprintln!("   Compiling {}", path.display());
        }
        match host.compile_all(path) {
            Ok(r) => report.merge(r),
            Err(e) => eprintln!("warning: {}: {e}", path.display()),
        }
    }

    for failure in &report.failures {
        eprintln!("warning: {}: {}", failure.path.display(), failure.message);
    }

    host.save_configuration_sync()?;
    tracing::debug!(stats = ?host.stats(), "build finished");

    if !global.quiet {
        eprintln!(
            "    Finished {} compiled, {} skipped, {} failed ({})",
            report.compiled,
            report.skipped,
            report.failed,
            cache_dir.display()
        );
    }
    Ok(0)
}
