//! Kiln CLI - build and serve Elm + JavaScript browser applications.
//!
//! Thin command-line layer over [`kiln_bundler`]:
//!
//! - [`cli`] - argument definitions
//! - [`config`] - `kiln.config.json`, `KILN_*` and flag merging
//! - [`commands`] - `build` and `serve`
//! - [`dev`] - dev server, watcher and rebuild loop used by `serve`
//! - [`error`] - error types with hints, rendered with miette
//! - [`logger`] and [`ui`] - logs and terminal output
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
