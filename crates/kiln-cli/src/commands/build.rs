//! `kiln build`: run the pipeline once and exit.

use crate::cli::BuildArgs;
use crate::commands::GlobalOptions;
use crate::config::{CliOverrides, KilnConfig};
use crate::error::Result;
use crate::ui;
use kiln_bundler::{BuildResult, Pipeline};
use std::path::Path;
use std::time::Instant;

/// Execute the build command.
///
/// 1. Load and validate configuration (CLI > Env > File > Defaults)
/// 2. Construct the pipeline for the current mode
/// 3. Run every stage and write the outputs
/// 4. Print a summary
///
/// Any failure is returned unchanged; `main` reports it and exits with
/// status 1. Nothing is written when a stage fails.
pub async fn execute(args: BuildArgs, options: &GlobalOptions) -> Result<()> {
    let config = KilnConfig::load(
        &options.cwd,
        options.config.as_deref(),
        &CliOverrides::from(&args),
    )?;

    let build_config = config.build_config(options.is_production, &options.cwd);
    let mode = build_config.mode();
    let pipeline = Pipeline::new(build_config, config.toolchain()?)?;

    ui::info(&format!(
        "Building for {} [{}]",
        mode,
        pipeline.describe().join(", ")
    ));

    let spinner = ui::Spinner::new("Building...");
    let started = Instant::now();

    let result = match pipeline.run().await {
        Ok(result) => result,
        Err(e) => {
            spinner.fail("Build failed");
            return Err(e.into());
        }
    };

    let elapsed = started.elapsed();
    spinner.finish(&format!("Built in {}", ui::format_duration(elapsed)));
    ui::print_build_summary(&summary_rows(&result, &options.cwd), elapsed);
    Ok(())
}

/// `(display path, size)` rows, paths relative to the project when possible.
fn summary_rows(result: &BuildResult, cwd: &Path) -> Vec<(String, u64)> {
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    result
        .files
        .iter()
        .map(|file| {
            let shown = file.path.strip_prefix(&cwd).unwrap_or(&file.path);
            (shown.display().to_string(), file.size as u64)
        })
        .collect()
}
