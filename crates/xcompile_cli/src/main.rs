//! xcompile CLI: batch pre-compilation and cache maintenance.
//!
//! `xcompile build` compiles a project ahead of time into `<appdir>/.cache`
//! so a deployment can serve it with a read-only host. `xcompile prune`
//! drops artifacts no change record refers to, and `xcompile config` shows
//! the configuration a host would be built from.

#![warn(missing_docs)]

mod build;
mod compilers;
mod config;
mod logging;
mod prune;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// xcompile: cached source transformation for web assets.
#[derive(Parser, Debug)]
#[command(name = "xcompile", version, about = "Cached source compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pre-compile every file under the given paths.
    Build(BuildArgs),
    /// Delete cached artifacts no longer referenced by any tracked file.
    Prune(AppDirArgs),
    /// Print the resolved project configuration as JSON.
    Config(AppDirArgs),
}

/// Arguments for the `xcompile build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Application root. The cache is written to `<appdir>/.cache`.
    #[arg(short, long, default_value = ".")]
    pub appdir: PathBuf,

    /// Files or directories to compile.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for subcommands that only need the application root.
#[derive(Parser, Debug)]
pub struct AppDirArgs {
    /// Application root.
    #[arg(short, long, default_value = ".")]
    pub appdir: PathBuf,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    if let Err(e) = logging::init(&global) {
        eprintln!("warning: {e}");
    }

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Prune(ref args) => prune::run(args, &global),
        Command::Config(ref args) => config::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
