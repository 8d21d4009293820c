//! # kiln-bundler
//!
//! Staged build pipeline for browser applications that mix plain JavaScript
//! glue with modules written in a functional UI language (Elm by default).
//!
//! A build is described by an immutable [`BuildConfig`]. [`Pipeline::new`]
//! turns it into a fixed, ordered list of [`Stage`]s:
//!
//! 1. `resolve` - read entry modules and follow their static imports
//! 2. `lower` - compile foreign modules with an external [`Compiler`]
//! 3. `bundle` - merge modules into one script per entry point
//! 4. `minify` - only in production, via an external [`Minifier`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln_bundler::{BuildConfig, Pipeline, Toolchain};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfig::resolve(true, ["index.js"], "public");
//! let pipeline = Pipeline::new(config, Toolchain::default())?;
//!
//! let result = pipeline.run().await?;
//! for file in &result.files {
//!     println!("wrote {} ({} bytes)", file.path.display(), file.size);
//! }
//! # Ok(()) }
//! ```

pub mod artifact;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod tool;

pub use artifact::{Artifact, Import, Module, ModuleKind, OutputFile, OutputKind};
pub use config::{BuildConfig, Mode};
pub use output::{BuildResult, WrittenFile};
pub use pipeline::{Pipeline, Toolchain};
pub use stage::{Stage, StageError};
pub use stages::lower::{Compiler, CompilerOptions, ElmCompiler};
pub use stages::minify::{Minifier, MinifyOptions, TerserMinifier};

/// Error types for kiln-bundler operations.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum Error {
    /// Invalid or missing build inputs.
    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(kiln::configuration),
        help("Check the `entry` list in kiln.config.json or on the command line")
    )]
    Configuration(String),

    /// A named pipeline stage failed.
    #[error("Stage '{stage}' failed: {source}")]
    #[diagnostic(code(kiln::stage))]
    Stage {
        stage: String,
        #[source]
        source: StageError,
    },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    #[diagnostic(code(kiln::output_path))]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    #[diagnostic(code(kiln::write), help("Check output directory permissions"))]
    WriteFailure(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(kiln::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Name of the stage that produced this error, if any.
    pub fn stage(&self) -> Option<&str> {
        match self {
            Error::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Whether this is a configuration error (fatal in every mode).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Result type alias for kiln-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_carries_stage_name() {
        let err = Error::Stage {
            stage: "lower".to_string(),
            source: StageError::Invalid("bad module".to_string()),
        };
        assert_eq!(err.stage(), Some("lower"));
        let msg = err.to_string();
        assert!(msg.contains("Stage 'lower' failed"));
        assert!(msg.contains("bad module"));
    }

    #[test]
    fn configuration_error_is_flagged() {
        let err = Error::Configuration("no entry points".to_string());
        assert!(err.is_configuration());
        assert!(err.stage().is_none());
    }
}
