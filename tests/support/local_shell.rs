// ABOUTME: RemoteExec implementations backed by the local `sh`.
// ABOUTME: Lets read/write command strings run for real without an SSH server.

use async_trait::async_trait;
use sshfile::error::{Error, Result};
use sshfile::ssh::{CommandOutput, RemoteExec};

/// Runs each command with `sh -c` on this machine.
#[derive(Default)]
pub struct LocalShell {
    pub commands: Vec<String>,
}

#[async_trait]
impl RemoteExec for LocalShell {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        self.commands.push(command.to_string());
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| Error::Session(e.to_string()))?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(255) as u32,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Fails the base64 pipeline the way a host without `base64` does.
pub struct WithoutBase64<E>(pub E);

#[async_trait]
impl<E: RemoteExec> RemoteExec for WithoutBase64<E> {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        if command.contains("| base64 -d") {
            return Ok(CommandOutput {
                exit_code: 127,
                stdout: Vec::new(),
                stderr: "sh: base64: not found".to_string(),
            });
        }
        self.0.exec(command).await
    }
}
