//! One-shot execution of external inquiry tools.
//!
//! Commands are spawned directly (no shell), with stdin closed, output
//! captured, and the child killed if the timeout elapses.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program is not installed or not on `PATH`.
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// The program did not finish in time.
    #[error("Command '{command}' timed out after {seconds} seconds")]
    Timeout {
        /// Program name.
        command: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// The program wrote to its error stream.
    #[error("Command '{command}' reported an error: {stderr}")]
    ErrorOutput {
        /// Program name.
        command: String,
        /// Captured error stream.
        stderr: String,
    },

    /// Spawning or waiting failed.
    #[error("I/O error running command: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
}

/// Run a program to completion and capture its output.
pub async fn run(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    tracing::trace!("Running '{}' with args {:?}", program, args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExecError::CommandNotFound(program.to_string()));
        }
        Ok(Err(e)) => return Err(ExecError::Io(e)),
        Err(_) => {
            return Err(ExecError::Timeout {
                command: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    })
}

/// Like [`run`], but a non-empty error stream counts as failure.
///
/// The exit code is ignored; `ps` exits non-zero for a user
/// with no processes, which is a valid zero-session answer.
pub async fn run_checked(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    let output = run(program, args, timeout).await?;

    if !output.stderr.trim().is_empty() {
        return Err(ExecError::ErrorOutput {
            command: program.to_string(),
            stderr: output.stderr.trim().chars().take(500).collect(),
        });
    }

    Ok(output)
}

/// Check if a program is available on the system.
pub async fn command_available(program: &str) -> bool {
    let result = Command::new("sh")
        .args(["-c", "command -v \"$1\"", "sh", program])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}
