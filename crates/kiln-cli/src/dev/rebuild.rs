//! Rebuild scheduling for serve mode.
//!
//! At most one build runs at a time. Rebuild requests are recorded in a
//! [`Notify`] that stores a single permit, so any number of requests made
//! while a build is running collapse into exactly one follow-up build.

use crate::dev::SharedState;
use crate::dev::watcher::FileChange;
use crate::ui;
use kiln_bundler::Pipeline;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, mpsc};

/// Handle used to ask for a rebuild. Cheap to clone.
#[derive(Clone, Default)]
pub struct RebuildTrigger {
    notify: Arc<Notify>,
}

impl RebuildTrigger {
    /// Ask for a rebuild. Requests made before the loop picks one up are
    /// merged.
    pub fn request(&self) {
        self.notify.notify_one();
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Owns the pipeline and publishes every build into the shared state.
pub struct Rebuilder {
    pipeline: Pipeline,
    state: SharedState,
    trigger: RebuildTrigger,
}

impl Rebuilder {
    pub fn new(pipeline: Pipeline, state: SharedState) -> Self {
        Self {
            pipeline,
            state,
            trigger: RebuildTrigger::default(),
        }
    }

    pub fn trigger(&self) -> RebuildTrigger {
        self.trigger.clone()
    }

    /// Build, write and publish once.
    ///
    /// On failure the error is recorded in the state and returned; the
    /// previously published snapshot stays in place.
    pub async fn build_once(&self) -> kiln_bundler::Result<()> {
        self.state.start_build();
        let started = Instant::now();

        let outcome = match self.pipeline.build().await {
            Ok(artifact) => self.pipeline.write(&artifact).await.map(|_| artifact),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(artifact) => {
                let elapsed = started.elapsed();
                self.state
                    .complete_build(&artifact, elapsed.as_millis() as u64);
                ui::success(&format!(
                    "Built {} file(s) in {}",
                    artifact.outputs.len(),
                    ui::format_duration(elapsed)
                ));
                Ok(())
            }
            Err(e) => {
                self.state.fail_build(e.to_string());
                tracing::debug!(error = ?e, "build failed");
                ui::error(&format!("Build failed: {}", e));
                if self.state.snapshot().generation() > 0 {
                    ui::warning("Still serving the previous build");
                }
                Err(e)
            }
        }
    }

    /// Rebuild whenever a request arrives. Runs until the task is dropped.
    ///
    /// Failures are reported and survived.
    pub async fn run(self) {
        loop {
            self.trigger.wait().await;
            if self.build_once().await.is_err() {
                tracing::debug!("rebuild failed, waiting for the next change");
            }
        }
    }
}

/// Turn watcher events into rebuild requests.
///
/// After the first change of a burst, waits `debounce` and drains whatever
/// else arrived so an editor's save-and-rename sequence costs one request.
pub async fn forward_changes(
    mut changes: mpsc::Receiver<FileChange>,
    trigger: RebuildTrigger,
    debounce: Duration,
) {
    while let Some(change) = changes.recv().await {
        tracing::info!(path = %change.path().display(), "change detected");
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }
        while changes.try_recv().is_ok() {}
        trigger.request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_collapse_into_one_permit() {
        let trigger = RebuildTrigger::default();
        for _ in 0..5 {
            trigger.request();
        }

        trigger.wait().await;
        let second = tokio::time::timeout(Duration::from_millis(50), trigger.wait()).await;
        assert!(second.is_err(), "only one permit should be stored");
    }

    #[tokio::test]
    async fn test_forward_changes_debounces_bursts() {
        let (tx, rx) = mpsc::channel(16);
        let trigger = RebuildTrigger::default();
        let forwarder = tokio::spawn(forward_changes(
            rx,
            trigger.clone(),
            Duration::from_millis(20),
        ));

        for name in ["a.js", "b.js", "Main.elm"] {
            tx.send(FileChange::Modified(name.into())).await.unwrap();
        }
        drop(tx);
        forwarder.await.unwrap();

        trigger.wait().await;
        let second = tokio::time::timeout(Duration::from_millis(50), trigger.wait()).await;
        assert!(second.is_err());
    }
}
