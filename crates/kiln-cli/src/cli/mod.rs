//! Command-line interface definition.
//!
//! - `kiln build` - one-shot build, exits 1 on failure
//! - `kiln serve` - dev server with watch and rebuild
//! - `kiln` - `build` when `NODE_ENV=production`, `serve` otherwise

mod commands;

use clap::Parser;
use std::path::PathBuf;

pub use commands::{BuildArgs, Command, ProjectArgs, ServeArgs};

/// Kiln - build and serve Elm + JavaScript browser applications
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Build and serve Elm + JavaScript browser applications",
    long_about = "Kiln resolves your entry modules, compiles Elm sources with `elm make`,\n\
                  bundles everything into one script per entry and minifies it with terser\n\
                  for production. In development it serves the build and rebuilds on change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level, including per-stage timings)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Build for production regardless of NODE_ENV
    #[arg(long, global = true, conflicts_with = "development")]
    pub production: bool,

    /// Build for development regardless of NODE_ENV
    #[arg(long, global = true)]
    pub development: bool,

    /// Path to a config file (default: ./kiln.config.json when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Explicit mode flag, if one was given.
    pub fn mode_override(&self) -> Option<bool> {
        if self.production {
            Some(true)
        } else if self.development {
            Some(false)
        } else {
            None
        }
    }

    /// The subcommand to run, defaulting by mode when none was given.
    pub fn command_or_default(&self, is_production: bool) -> Command {
        match &self.command {
            Some(command) => command.clone(),
            None if is_production => Command::Build(BuildArgs::default()),
            None => Command::Serve(ServeArgs::default()),
        }
    }
}
