//! Running external tools (compiler, minifier) as child processes.

use crate::stage::StageError;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

/// Default timeout for a single tool invocation (5 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// A command line to run: program plus leading arguments.
///
/// Configured commands may carry arguments of their own, e.g.
/// `npx --no-install terser`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl ToolCommand {
    /// Split a configured command on whitespace.
    pub fn parse(command: &str) -> Result<Self, StageError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| StageError::Invalid("empty tool command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run with extra arguments, optionally feeding `stdin`, and return stdout.
    pub async fn run(
        &self,
        extra_args: &[String],
        cwd: &Path,
        stdin: Option<&str>,
    ) -> Result<Vec<u8>, StageError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(extra_args)
            .current_dir(cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.program,
            args = ?extra_args,
            "spawning external tool"
        );

        let mut child = cmd.spawn().map_err(|source| StageError::ToolLaunch {
            tool: self.program.clone(),
            source,
        })?;

        // Feed stdin while collecting output; both run under the timeout
        let pipe = child.stdin.take();
        let feed = async move {
            let (Some(input), Some(mut pipe)) = (stdin, pipe) else {
                return Ok(());
            };
            let written = pipe.write_all(input.as_bytes()).await;
            // Close stdin to signal EOF
            drop(pipe);
            match written {
                // The tool exited without reading everything; its exit status
                // and stderr explain why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        let (fed, output) = timeout(Duration::from_secs(self.timeout_secs), async {
            tokio::join!(feed, child.wait_with_output())
        })
        .await
        .map_err(|_| StageError::ToolTimeout {
            tool: self.program.clone(),
            seconds: self.timeout_secs,
        })?;
        let output = output?;

        if !output.status.success() {
            return Err(StageError::ToolFailed {
                tool: self.program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        fed?;
        Ok(output.stdout)
    }
}

/// Read a file produced by a tool, mapping errors to the file path.
pub(crate) async fn read_tool_output(path: &Path) -> Result<String, StageError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StageError::Read {
            path: path.to_path_buf(),
            source,
        })
}
