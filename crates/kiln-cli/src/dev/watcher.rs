//! File system watcher for serve mode.
//!
//! Watches the whole project directory and forwards changes to source files.
//! Dependencies, compiler caches, the output directory and hidden files are
//! filtered out before anything reaches the rebuild loop.

use crate::dev::DevConfig;
use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Capacity of the change channel. Overflowing events are dropped: one
/// pending change is enough to schedule a rebuild.
const CHANNEL_CAPACITY: usize = 256;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_event_kind(kind: &EventKind, path: PathBuf) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path)),
            EventKind::Modify(_) => Some(FileChange::Modified(path)),
            EventKind::Remove(_) => Some(FileChange::Removed(path)),
            _ => None,
        }
    }
}

/// Decides which paths are worth a rebuild.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    out_dir: PathBuf,
    ignore_patterns: Vec<String>,
    extensions: Vec<String>,
}

impl WatchFilter {
    pub fn new(
        root: PathBuf,
        out_dir: PathBuf,
        ignore_patterns: Vec<String>,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            root,
            out_dir,
            ignore_patterns,
            extensions,
        }
    }

    pub fn from_config(config: &DevConfig) -> Self {
        Self::new(
            config.cwd.clone(),
            config.out_dir.clone(),
            config.watch_ignore.clone(),
            config.source_extensions.clone(),
        )
    }

    /// Whether a change to `path` should trigger a rebuild.
    pub fn accepts(&self, path: &Path) -> bool {
        !self.should_ignore(path) && self.is_source(path)
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    fn should_ignore(&self, path: &Path) -> bool {
        if path.starts_with(&self.out_dir) {
            return true;
        }

        // Only watch files within root
        let Ok(rel_path) = path.strip_prefix(&self.root) else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();

        for component in rel_path.components() {
            let Some(name) = component.as_os_str().to_str() else {
                continue;
            };
            if name.starts_with('.') && name != "." && name != ".." {
                return true;
            }
            if self.ignore_patterns.iter().any(|pattern| pattern == name) {
                return true;
            }
        }

        self.ignore_patterns.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix('*') {
                path_str.ends_with(suffix)
            } else {
                path_str.starts_with(pattern.as_str())
            }
        })
    }
}

/// Recursive watcher sending filtered changes through a channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `filter.root`.
    ///
    /// The watcher stops when the returned value is dropped.
    pub fn new(filter: WatchFilter) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let root = filter.root.clone();
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "file watcher error");
                    return;
                }
            };
            for path in event.paths {
                if !filter.accepts(&path) {
                    continue;
                }
                if let Some(change) = FileChange::from_event_kind(&event.kind, path) {
                    tracing::debug!(?change, "source changed");
                    let _ = tx.try_send(change);
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
