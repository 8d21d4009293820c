//! Kiln CLI entry point: parse arguments, set up logging, dispatch.

use clap::Parser;
use kiln_cli::commands::{self, GlobalOptions};
use kiln_cli::{ResultExt, cli, config, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = run(args).await;

    // Non-zero exit comes from returning the report
    result.map_err(error::cli_error_to_miette)
}

async fn run(args: cli::Cli) -> error::Result<()> {
    let cwd = std::env::current_dir().context("Cannot read the working directory")?;
    let is_production = config::is_production(args.mode_override());
    let options = GlobalOptions {
        cwd,
        is_production,
        config: args.config.clone(),
    };

    match args.command_or_default(is_production) {
        cli::Command::Build(build_args) => commands::build_execute(build_args, &options).await,
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args, &options).await,
    }
}
