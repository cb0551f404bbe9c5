//! `xcompile config`: show the resolved project configuration.

use xcompile_config::{resolve_project_config, ProcessEnv};

use crate::{AppDirArgs, GlobalArgs};

/// Runs the `xcompile config` command, printing JSON to stdout.
pub fn run(args: &AppDirArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_project_config(&args.appdir, &ProcessEnv)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(0)
}
