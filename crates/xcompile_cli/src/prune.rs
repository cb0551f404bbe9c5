//! `xcompile prune`: drop unreferenced artifacts from `<appdir>/.cache`.

use xcompile_config::production_cache_dir;
use xcompile_host::create_host_from_project_root;

use crate::{compilers, AppDirArgs, GlobalArgs};

/// Runs the `xcompile prune` command.
pub fn run(args: &AppDirArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cache_dir = production_cache_dir(&args.appdir);
    if !cache_dir.is_dir() {
        return Err(format!("no cache at {}", cache_dir.display()).into());
    }

    let host = create_host_from_project_root(&args.appdir, &cache_dir, compilers::builtin())?;
    let removed = host.prune()?;
    tracing::debug!(removed, cache_dir = %cache_dir.display(), "pruned artifacts");

    if !global.quiet {
        eprintln!("     Removed {removed} unreferenced artifact(s)");
    }
    Ok(0)
}
