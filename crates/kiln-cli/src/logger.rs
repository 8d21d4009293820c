//! Logging setup for the kiln CLI.
//!
//! Built on `tracing`. `--verbose` turns on debug output for the kiln crates
//! (including per-stage timings from the pipeline), `--quiet` limits output to
//! errors, and `RUST_LOG` is honoured when neither flag is given.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "kiln=debug,kiln_bundler=debug,kiln_cli=debug";
const QUIET_FILTER: &str = "kiln=error,kiln_bundler=error,kiln_cli=error";
const DEFAULT_FILTER: &str = "kiln=info,kiln_bundler=info,kiln_cli=info";

/// Initialize the global tracing subscriber.
///
/// Must be called once, before anything logs. `verbose` wins over `quiet`.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
