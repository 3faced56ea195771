// ABOUTME: Command execution seam between file operations and the SSH session.
// ABOUTME: Lets the read/write logic run against a live session or a local shell.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Output from a remote command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output, byte for byte.
    pub stdout: Vec<u8>,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// One-line description of a failed command, for error messages.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("process exited with status {}", self.exit_code)
        } else {
            format!("process exited with status {}: {}", self.exit_code, stderr)
        }
    }
}

/// Runs one shell command per call on the remote side.
#[async_trait]
pub trait RemoteExec: Send {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput>;
}

/// Run `fut` until it completes, `timeout` elapses, or `cancel` fires.
pub async fn bounded<T, F>(fut: F, timeout: Duration, cancel: &CancellationToken) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = tokio::time::timeout(timeout, fut) => {
            res.unwrap_or_else(|_| Err(Error::Timeout(timeout)))
        }
    }
}
