//! Build pipeline: configuration in, files on disk out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::artifact::Artifact;
use crate::config::{BuildConfig, resolve_path};
use crate::output::{BuildResult, write_outputs};
use crate::stage::Stage;
use crate::stages::lower::{Compiler, CompilerOptions, ElmCompiler};
use crate::stages::minify::{Minifier, MinifyOptions, TerserMinifier};
use crate::stages::{BundleStage, LowerStage, MinifyStage, ResolveStage};
use crate::{Error, Result};

/// External tools used by the built-in stages.
#[derive(Clone)]
pub struct Toolchain {
    pub compiler: Arc<dyn Compiler>,
    pub minifier: Arc<dyn Minifier>,
    /// File extensions handed to `compiler` instead of being scanned as JavaScript
    pub foreign_extensions: Vec<String>,
    pub minify_options: MinifyOptions,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            compiler: Arc::new(ElmCompiler::default()),
            minifier: Arc::new(TerserMinifier::default()),
            foreign_extensions: vec!["elm".to_string()],
            minify_options: MinifyOptions::default(),
        }
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain")
            .field("compiler", &self.compiler.language())
            .field("minifier", &self.minifier.name())
            .field("foreign_extensions", &self.foreign_extensions)
            .finish()
    }
}

/// An ordered, fixed list of stages built from one [`BuildConfig`].
///
/// For a production config the stages are
/// `resolve, lower(debug=false), bundle, minify`; for development
/// `resolve, lower(debug=true), bundle`.
pub struct Pipeline {
    config: BuildConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Build the standard pipeline for `config`.
    ///
    /// Fails with [`Error::Configuration`] when there are no entry points.
    pub fn new(config: BuildConfig, toolchain: Toolchain) -> Result<Self> {
        let minify = config.minify();
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ResolveStage::new(&toolchain.foreign_extensions)),
            Box::new(LowerStage::new(
                toolchain.compiler,
                CompilerOptions::for_minify(minify),
            )),
            Box::new(BundleStage::new(config.source_maps())),
        ];
        if minify {
            stages.push(Box::new(MinifyStage::new(
                toolchain.minifier,
                toolchain.minify_options,
            )));
        }
        Self::with_stages(config, stages)
    }

    /// Use a custom stage list.
    pub fn with_stages(config: BuildConfig, stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        if config.entry_points().is_empty() {
            return Err(Error::Configuration(
                "no entry points were given".to_string(),
            ));
        }
        Ok(Self { config, stages })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Stage names with their options, e.g. `lower(debug=false)`.
    pub fn describe(&self) -> Vec<String> {
        self.stages.iter().map(|stage| stage.describe()).collect()
    }

    /// Run every stage and return the final artifact without writing it.
    ///
    /// The first failing stage aborts the build; its error carries the
    /// stage name.
    pub async fn build(&self) -> Result<Artifact> {
        let cwd = tokio::fs::canonicalize(self.config.cwd())
            .await
            .map_err(|e| {
                Error::Configuration(format!(
                    "project directory '{}' is not accessible: {}",
                    self.config.cwd().display(),
                    e
                ))
            })?;
        let entries: Vec<PathBuf> = self
            .config
            .entry_points()
            .iter()
            .map(|entry| resolve_path(entry, &cwd))
            .collect();

        tracing::info!(
            mode = %self.config.mode(),
            entries = entries.len(),
            "starting build"
        );

        let mut artifact = Artifact::new(cwd, entries);
        for stage in &self.stages {
            let started = Instant::now();
            tracing::debug!(stage = %stage.describe(), "running stage");

            artifact = stage.run(artifact).await.map_err(|source| {
                tracing::debug!(stage = stage.name(), error = %source, "stage failed");
                Error::Stage {
                    stage: stage.name().to_string(),
                    source,
                }
            })?;

            tracing::debug!(
                stage = stage.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "stage finished"
            );
        }
        Ok(artifact)
    }

    /// Write an artifact's outputs into the output directory.
    ///
    /// The filesystem work runs on tokio's blocking pool.
    pub async fn write(&self, artifact: &Artifact) -> Result<BuildResult> {
        let out_dir = resolve_path(self.config.out_dir(), artifact.cwd());
        let outputs = artifact.outputs.clone();
        let dir = out_dir.clone();
        let files = tokio::task::spawn_blocking(move || write_outputs(&outputs, &dir))
            .await
            .map_err(|e| Error::WriteFailure(format!("output writer did not finish: {e}")))??;
        tracing::info!(
            files = files.len(),
            out_dir = %out_dir.display(),
            "build written"
        );
        Ok(BuildResult { files })
    }

    /// Build and write. Nothing is written if any stage fails.
    pub async fn run(&self) -> Result<BuildResult> {
        let artifact = self.build().await?;
        self.write(&artifact).await
    }
}
