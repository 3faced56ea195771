// ABOUTME: One-shot remote file operations: read, write, upload, download.
// ABOUTME: Each call resolves auth, opens its own session, and always closes it.

use crate::config::ConnectionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::remote::{self, WriteStrategy};
use crate::ssh::{Session, resolve_auth_methods};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Validate, resolve credentials, and connect.
///
/// Fails with `NoAuthMethod` before any network I/O when no credential is
/// usable.
async fn open_session(
    config: &ConnectionConfig,
    cancel: &CancellationToken,
    diag: &mut Diagnostics,
) -> Result<Session> {
    config.validate()?;
    let methods = resolve_auth_methods(
        config.key_path.as_deref(),
        config.password.as_deref(),
        diag,
    )?;
    tracing::debug!(uri = %config.display_uri(), ?methods, "opening session");
    Session::connect(config, &methods, cancel).await
}

/// Read `config.remote_path` and return its bytes.
pub async fn read_remote_file(
    config: &ConnectionConfig,
    cancel: &CancellationToken,
    diag: &mut Diagnostics,
) -> Result<Vec<u8>> {
    let mut session = open_session(config, cancel, diag).await?;
    let result = remote::read_file(&mut session, &config.remote_path).await;
    session.close(diag).await;

    if let Ok(content) = &result {
        tracing::info!(uri = %config.display_uri(), bytes = content.len(), "read remote file");
    }
    result
}

/// Replace the content of `config.remote_path` with `content`.
///
/// The content is sent inline in one remote command, so the remote host's
/// per-argument limit bounds its size (about 96 KiB on Linux).
pub async fn write_remote_file(
    config: &ConnectionConfig,
    content: &[u8],
    cancel: &CancellationToken,
    diag: &mut Diagnostics,
) -> Result<WriteStrategy> {
    let mut session = open_session(config, cancel, diag).await?;
    let result = remote::write_file(&mut session, &config.remote_path, content, diag).await;
    session.close(diag).await;

    if let Ok(strategy) = &result {
        tracing::info!(
            uri = %config.display_uri(),
            bytes = content.len(),
            %strategy,
            "wrote remote file"
        );
    }
    result
}

/// Copy a local file to `config.remote_path`.
///
/// Subject to the same size bound as [`write_remote_file`].
pub async fn upload_file(
    config: &ConnectionConfig,
    local_path: &Path,
    cancel: &CancellationToken,
    diag: &mut Diagnostics,
) -> Result<WriteStrategy> {
    let content = tokio::fs::read(local_path)
        .await
        .map_err(|e| Error::io(local_path, e))?;
    write_remote_file(config, &content, cancel, diag).await
}

/// Copy `config.remote_path` to a local file, returning the byte count.
pub async fn download_file(
    config: &ConnectionConfig,
    local_path: &Path,
    cancel: &CancellationToken,
    diag: &mut Diagnostics,
) -> Result<u64> {
    let content = read_remote_file(config, cancel, diag).await?;
    tokio::fs::write(local_path, &content)
        .await
        .map_err(|e| Error::io(local_path, e))?;
    Ok(content.len() as u64)
}
