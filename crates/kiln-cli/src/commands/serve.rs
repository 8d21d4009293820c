//! `kiln serve`: serve the output directory and rebuild on change.

use crate::cli::ServeArgs;
use crate::commands::GlobalOptions;
use crate::config::{CliOverrides, KilnConfig};
use crate::dev::rebuild::forward_changes;
use crate::dev::{DevConfig, DevServer, DevServerState, FileWatcher, Rebuilder, WatchFilter};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use kiln_bundler::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Execute the serve command.
///
/// The first build runs before the watcher starts. Configuration errors stop
/// the command; a failing build does not. The server then keeps answering
/// with the last good build until Ctrl+C, which exits cleanly.
pub async fn execute(args: ServeArgs, options: &GlobalOptions) -> Result<()> {
    let config = KilnConfig::load(
        &options.cwd,
        options.config.as_deref(),
        &CliOverrides::from(&args),
    )?;
    let dev_config = DevConfig::new(&config, options.cwd.clone());

    let build_config = config.build_config(options.is_production, &options.cwd);
    let mode = build_config.mode();
    let pipeline = Pipeline::new(build_config, config.toolchain()?)?;
    if mode.is_production() {
        ui::warning("Serving a production build: every rebuild is minified");
    }

    let state = Arc::new(DevServerState::new(dev_config.out_dir.clone()));
    let server = DevServer::bind(&dev_config.host, dev_config.port, state.clone()).await?;

    let rebuilder = Rebuilder::new(pipeline, state.clone());
    ui::info(&format!("Initial {} build...", mode));
    if let Err(e) = rebuilder.build_once().await {
        let err = CliError::from(e);
        if err.is_fatal_in_serve() {
            return Err(err);
        }
        ui::warning("Serving without a build; save a file to retry");
    }

    let (watcher, changes) = FileWatcher::new(WatchFilter::from_config(&dev_config))
        .with_hint("On Linux, raise the watch limit: sysctl fs.inotify.max_user_watches=524288")?;
    ui::info(&format!(
        "Watching for changes in {}",
        watcher.root().display()
    ));

    let trigger = rebuilder.trigger();
    let rebuild_task = tokio::spawn(rebuilder.run());
    let forward_task = tokio::spawn(forward_changes(
        changes,
        trigger,
        Duration::from_millis(dev_config.debounce_ms),
    ));

    let url = server
        .local_addr()
        .map(|addr| format!("http://{addr}"))
        .unwrap_or_else(|_| dev_config.server_url());
    ui::success(&format!(
        "Serving {} at {}",
        dev_config.out_dir.display(),
        url
    ));
    ui::info("Press Ctrl+C to stop");

    let served = server.run(shutdown_signal()).await;

    forward_task.abort();
    rebuild_task.abort();
    drop(watcher);

    served?;
    ui::success("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    ui::info("Shutting down...");
}
