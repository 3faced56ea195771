// ABOUTME: Remote file read and write over a command-execution channel.
// ABOUTME: Writes try base64 first and fall back to an escaped here-document.

pub mod command;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::ssh::RemoteExec;
use command::{base64_write_command, heredoc_delimiter, heredoc_write_command, read_command};
use std::fmt;

/// How a write reached the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Content piped through `base64 -d`.
    Base64,
    /// Escaped content in a here-document.
    HereDoc,
}

impl fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStrategy::Base64 => f.write_str("base64"),
            WriteStrategy::HereDoc => f.write_str("here-document"),
        }
    }
}

/// Read the whole remote file, returning its bytes verbatim.
pub async fn read_file<E: RemoteExec + ?Sized>(exec: &mut E, path: &str) -> Result<Vec<u8>> {
    match exec.exec(&read_command(path)).await {
        Ok(output) if output.success() => Ok(output.stdout),
        Ok(output) => Err(Error::Read(output.failure_message())),
        Err(e) if e.aborts_operation() => Err(e),
        Err(e) => Err(Error::Read(e.to_string())),
    }
}

/// Replace the remote file's content with `content`.
///
/// The here-document fallback runs only when the base64 command fails; it
/// needs UTF-8 content without NUL bytes, since the remote shell receives
/// the command as a C string.
///
/// The whole content travels inside one command string. On Linux hosts a
/// single argument is capped at 128 KiB, so base64 writes top out near
/// 96 KiB of content.
pub async fn write_file<E: RemoteExec + ?Sized>(
    exec: &mut E,
    path: &str,
    content: &[u8],
    diag: &mut Diagnostics,
) -> Result<WriteStrategy> {
    let primary_failure = match attempt(exec, &base64_write_command(path, content)).await? {
        None => return Ok(WriteStrategy::Base64),
        Some(reason) => reason,
    };
    tracing::debug!(
        path,
        reason = %primary_failure,
        "base64 write failed, trying here-document"
    );

    let text = std::str::from_utf8(content).map_err(|_| {
        Error::Write(format!(
            "{}; here-document fallback needs UTF-8 content",
            primary_failure
        ))
    })?;
    if content.contains(&0) {
        return Err(Error::Write(format!(
            "{}; here-document fallback cannot carry NUL bytes",
            primary_failure
        )));
    }

    let fallback = heredoc_write_command(path, text, &heredoc_delimiter());
    match attempt(exec, &fallback).await? {
        None => {
            diag.warn(Warning::write_fallback(format!(
                "base64 write to {} failed ({}), wrote with here-document",
                path, primary_failure
            )));
            Ok(WriteStrategy::HereDoc)
        }
        Some(reason) => Err(Error::Write(reason)),
    }
}

/// `Ok(None)` on success, `Ok(Some(reason))` when the command failed in a
/// way another strategy may avoid, `Err` when the operation must stop.
async fn attempt<E: RemoteExec + ?Sized>(exec: &mut E, command: &str) -> Result<Option<String>> {
    match exec.exec(command).await {
        Ok(output) if output.success() => Ok(None),
        Ok(output) => Ok(Some(output.failure_message())),
        Err(e) if e.aborts_operation() => Err(e),
        Err(e) => Ok(Some(e.to_string())),
    }
}
