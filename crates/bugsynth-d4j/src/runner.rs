//! External command execution.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ToolError};

/// Captured result of one command invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Rendered command line, for diagnostics.
    pub command: String,

    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl ToolOutput {
    /// Whether this invocation succeeded (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Turn a non-zero exit into [`ToolError::NonZeroExit`].
    pub fn require_success(self) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(ToolError::NonZeroExit {
                command: self.command,
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    /// Wall time in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Runs a program to completion and captures its output.
pub struct ToolRunner;

impl ToolRunner {
    /// Execute `program args...` in `cwd` (or the current directory).
    ///
    /// A non-zero exit is *not* an error here; callers decide with
    /// [`ToolOutput::require_success`]. A `timeout_secs` of 0 waits forever.
    pub async fn run<S: AsRef<OsStr>>(
        program: &Path,
        args: &[S],
        cwd: Option<&Path>,
        timeout_secs: u64,
    ) -> Result<ToolOutput> {
        let rendered = render_command(program, args);
        let start = Instant::now();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        debug!(command = %rendered, "spawning tool");
        let child = command.spawn().map_err(|source| ToolError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

        let output = if timeout_secs > 0 {
            tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
                .await
                .map_err(|_| ToolError::Timeout {
                    command: rendered.clone(),
                    timeout_secs,
                })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(command = %rendered, exit_code, duration_ms, "tool finished");

        Ok(ToolOutput {
            command: rendered,
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}

fn render_command<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()));
    parts.join(" ")
}
