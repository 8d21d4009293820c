//! The stage abstraction.
//!
//! A stage is one named transform in the pipeline. Stages never see each
//! other; the pipeline hands each one the artifact produced by the previous
//! stage and attaches the stage name to any error it returns.

use crate::artifact::Artifact;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Failure raised inside a stage, before the stage name is attached.
#[derive(Debug, Error)]
pub enum StageError {
    /// Entry point does not exist
    #[error("entry point not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    /// Import specifier could not be resolved
    #[error("cannot resolve '{specifier}' imported from {}: {reason}", .importer.display())]
    Unresolved {
        specifier: String,
        importer: PathBuf,
        reason: String,
    },

    /// Source file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External tool could not be started
    #[error("failed to launch '{tool}': {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool ran and reported failure
    #[error("'{tool}' exited with code {code}:\n{stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// External tool did not finish in time
    #[error("'{tool}' timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    /// Input the stage cannot handle
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One transform step of a build.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Human-readable options, e.g. `debug=false`, shown next to the name.
    fn describe(&self) -> String {
        self.name().to_string()
    }

    async fn run(&self, artifact: Artifact) -> Result<Artifact, StageError>;
}
