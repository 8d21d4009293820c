//! Shared state for the development server.
//!
//! The served files live in an immutable [`Snapshot`] behind an `Arc`.
//! A successful build replaces the whole snapshot in one assignment, so a
//! request sees either the previous build or the new one, never a mix.
//! Failed builds only touch the status.

use axum::body::Bytes;
use kiln_bundler::{Artifact, OutputKind};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No build has been performed yet
    NotStarted,
    /// Build is currently in progress
    InProgress { started_at: Instant },
    /// Build completed successfully
    Success { duration_ms: u64 },
    /// Build failed with error
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Get error message if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            BuildStatus::NotStarted => "idle",
            BuildStatus::InProgress { .. } => "building",
            BuildStatus::Success { .. } => "ok",
            BuildStatus::Failed { .. } => "failed",
        }
    }
}

/// One bundled file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedFile {
    pub contents: Bytes,
    pub content_type: &'static str,
}

/// Every file produced by one successful build, keyed by URL path.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: HashMap<String, ServedFile>,
    generation: u64,
}

impl Snapshot {
    /// Capture an artifact's outputs. `generation` counts successful builds.
    pub fn from_artifact(artifact: &Artifact, generation: u64) -> Self {
        let files = artifact
            .outputs
            .iter()
            .map(|output| {
                (
                    format!("/{}", output.file_name),
                    ServedFile {
                        contents: Bytes::from(output.contents.clone()),
                        content_type: content_type_for(output.kind),
                    },
                )
            })
            .collect();
        Self { files, generation }
    }

    pub fn get(&self, path: &str) -> Option<&ServedFile> {
        self.files.get(path)
    }

    /// URL paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn content_type_for(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Script => "application/javascript; charset=utf-8",
        OutputKind::SourceMap => "application/json",
    }
}

/// Body of `GET /__kiln/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Successful builds so far; the one being served
    pub generation: u64,
    pub files: Vec<String>,
}

/// Shared development server state.
pub struct DevServerState {
    status: RwLock<BuildStatus>,
    snapshot: RwLock<Arc<Snapshot>>,
    out_dir: PathBuf,
}

impl DevServerState {
    /// `out_dir` is where files outside the snapshot are served from.
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            out_dir,
        }
    }

    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    /// Publish a successful build.
    pub fn complete_build(&self, artifact: &Artifact, duration_ms: u64) {
        let generation = self.snapshot.read().generation() + 1;
        let snapshot = Arc::new(Snapshot::from_artifact(artifact, generation));
        *self.snapshot.write() = snapshot;
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    /// Record a failure. The current snapshot keeps being served.
    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// The build currently being served.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn status_report(&self) -> StatusReport {
        let status = self.status();
        let snapshot = self.snapshot();
        StatusReport {
            status: status.label(),
            error: status.error().map(str::to_string),
            duration_ms: match status {
                BuildStatus::Success { duration_ms } => Some(duration_ms),
                _ => None,
            },
            generation: snapshot.generation(),
            files: snapshot.paths(),
        }
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;
