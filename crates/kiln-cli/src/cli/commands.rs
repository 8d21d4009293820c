use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available kiln subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build once and exit
    ///
    /// Runs every stage in order and writes the bundles to the output
    /// directory. Exits with status 1 if any stage fails.
    Build(BuildArgs),

    /// Serve the output directory and rebuild on change
    ///
    /// Failed rebuilds are reported and the last good build keeps being
    /// served. Stop with Ctrl+C.
    Serve(ServeArgs),
}

/// Entry points and output directory, shared by both subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Entry points (default: index.js)
    ///
    /// Each entry point becomes one bundle named after its file stem.
    #[arg(value_name = "ENTRY")]
    pub entry: Vec<PathBuf>,

    /// Output directory (default: public)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Port to listen on (default: 8000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (default: 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,
}
