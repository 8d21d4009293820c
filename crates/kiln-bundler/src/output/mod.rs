//! Writing pipeline outputs to disk.

pub mod writer;

use crate::artifact::OutputKind;
use std::path::PathBuf;

pub use writer::write_outputs;

/// A file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// Size in bytes
    pub size: usize,
    pub kind: OutputKind,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    /// Files in the order the bundle stage emitted them
    pub files: Vec<WrittenFile>,
}
