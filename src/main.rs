// ABOUTME: Entry point for the sshfile CLI application.
// ABOUTME: Parses arguments, builds the connection config, and runs one transfer.

mod cli;
mod output;

use clap::Parser;
use cli::{Cli, Commands, ConnectArgs};
use output::Output;
use sshfile::config::{ConnectionConfig, Profile};
use sshfile::diagnostics::Diagnostics;
use sshfile::error::{Error, Result};
use sshfile::logging;
use sshfile::transfer;
use std::env;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli_logging(cli.verbose);

    let mut output = Output::new(cli.output);
    let mut diag = Diagnostics::default();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    output.start_timer();
    let result = run(cli, &output, &cancel, &mut diag).await;
    output.warnings(&diag);

    if let Err(e) = result {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    output: &Output,
    cancel: &CancellationToken,
    diag: &mut Diagnostics,
) -> Result<()> {
    let profile = load_profile(cli.config.as_deref())?;

    match cli.command {
        Commands::Read { conn, remote_path } => {
            let config = connection_config(&profile, &conn, &remote_path)?;
            let content = transfer::read_remote_file(&config, cancel, diag).await?;
            output
                .content(&content)
                .map_err(|e| Error::io("<stdout>", e))
        }
        Commands::Write {
            conn,
            remote_path,
            file,
        } => {
            let config = connection_config(&profile, &conn, &remote_path)?;
            let content = read_input(file.as_deref()).await?;
            let strategy = transfer::write_remote_file(&config, &content, cancel, diag).await?;
            output.success(
                &format!(
                    "Wrote {} bytes to {} ({})",
                    content.len(),
                    config.display_uri(),
                    strategy
                ),
                content.len() as u64,
            );
            Ok(())
        }
        Commands::Upload {
            conn,
            local,
            remote_path,
        } => {
            let config = connection_config(&profile, &conn, &remote_path)?;
            let strategy = transfer::upload_file(&config, &local, cancel, diag).await?;
            let bytes = tokio::fs::metadata(&local).await.map(|m| m.len()).unwrap_or(0);
            output.success(
                &format!(
                    "Uploaded {} to {} ({})",
                    local.display(),
                    config.display_uri(),
                    strategy
                ),
                bytes,
            );
            Ok(())
        }
        Commands::Download {
            conn,
            remote_path,
            local,
        } => {
            let config = connection_config(&profile, &conn, &remote_path)?;
            let bytes = transfer::download_file(&config, &local, cancel, diag).await?;
            output.success(
                &format!(
                    "Downloaded {} to {} ({} bytes)",
                    config.display_uri(),
                    local.display(),
                    bytes
                ),
                bytes,
            );
            Ok(())
        }
    }
}

/// Explicit `--config`, else a profile discovered in the current directory.
fn load_profile(path: Option<&Path>) -> Result<Profile> {
    match path {
        Some(path) => Profile::load(path),
        None => {
            let cwd = env::current_dir().map_err(|e| Error::io(PathBuf::from("."), e))?;
            Ok(Profile::discover(&cwd)?.unwrap_or_default())
        }
    }
}

fn connection_config(
    profile: &Profile,
    conn: &ConnectArgs,
    remote_path: &str,
) -> Result<ConnectionConfig> {
    let config = profile.connection_config(&conn.target, remote_path)?;
    Ok(conn.apply(config))
}

/// Content for `write`: the given file, or all of stdin.
async fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => tokio::fs::read(path).await.map_err(|e| Error::io(path, e)),
        None => {
            let mut content = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut content)
                .await
                .map_err(|e| Error::io("<stdin>", e))?;
            Ok(content)
        }
    }
}
