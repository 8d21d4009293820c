//! Conversion of CLI errors into miette reports.

use crate::error::CliError;
use miette::Report;

/// Convert a [`CliError`] into a report for the terminal.
///
/// Stage failures get a help line pointing at the tool that most likely
/// caused them.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundler(e) => bundler_error_to_miette(e),
        CliError::Config(e) => miette::miette!(
            help = "See kiln.config.json, KILN_* environment variables and command line flags",
            "Configuration error: {}",
            e
        ),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a pipeline error into a report.
pub fn bundler_error_to_miette(err: kiln_bundler::Error) -> Report {
    match stage_help(&err) {
        Some(help) => miette::miette!(help = help, "{}", err),
        None => Report::new(err),
    }
}

fn stage_help(err: &kiln_bundler::Error) -> Option<&'static str> {
    match err.stage()? {
        "resolve" => Some("Check the import paths and that node_modules is installed"),
        "lower" => Some("Is the Elm compiler installed? Try running `elm make` by hand"),
        "bundle" => Some("Only static `import` and `export` statements are supported"),
        "minify" => Some("Is terser installed? Try `npm install -g terser`"),
        _ => None,
    }
}
