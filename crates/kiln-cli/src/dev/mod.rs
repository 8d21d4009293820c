//! Serve mode: dev server, file watcher and rebuild loop.
//!
//! The first build runs before anything is served. After that the watcher
//! feeds [`rebuild::forward_changes`], which asks the [`Rebuilder`] for a new
//! build; each success atomically replaces the snapshot the server reads from.

pub mod config;
pub mod rebuild;
pub mod server;
pub mod state;
pub mod watcher;

pub use config::DevConfig;
pub use rebuild::{RebuildTrigger, Rebuilder};
pub use server::{DevServer, STATUS_PATH, router};
pub use state::{BuildStatus, DevServerState, SharedState, Snapshot, StatusReport};
pub use watcher::{FileChange, FileWatcher, WatchFilter};
