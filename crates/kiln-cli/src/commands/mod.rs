//! Command implementations.
//!
//! - [`build`] - one-shot build
//! - [`serve`] - dev server with rebuild on change
//!
//! Each command provides an `execute` function taking its parsed arguments
//! and the invocation-wide [`GlobalOptions`].

pub mod build;
pub mod serve;

use std::path::PathBuf;

pub use build::execute as build_execute;
pub use serve::execute as serve_execute;

/// Settings resolved once in `main` and shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Project root; relative paths in the config are resolved against it
    pub cwd: PathBuf,
    /// Production signal, already read from flags or `NODE_ENV`
    pub is_production: bool,
    /// Explicit `--config` file
    pub config: Option<PathBuf>,
}
