// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the read/write/upload/download subcommands and connection flags.

use crate::output::OutputMode;
use clap::{Args, Parser, Subcommand};
use sshfile::config::{ConnectionConfig, HostKeyPolicy, Target};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sshfile")]
#[command(about = "Read and write remote files over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    /// Profile file (defaults to sshfile.yml in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a remote file to stdout
    Read {
        #[command(flatten)]
        conn: ConnectArgs,

        /// Path of the file on the remote host
        remote_path: String,
    },

    /// Replace a remote file's content with stdin or a local file
    Write {
        #[command(flatten)]
        conn: ConnectArgs,

        /// Path of the file on the remote host
        remote_path: String,

        /// Read content from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Copy a local file to the remote host
    Upload {
        #[command(flatten)]
        conn: ConnectArgs,

        /// Local source file
        local: PathBuf,

        /// Destination path on the remote host
        remote_path: String,
    },

    /// Copy a remote file to a local path
    Download {
        #[command(flatten)]
        conn: ConnectArgs,

        /// Source path on the remote host
        remote_path: String,

        /// Local destination file
        local: PathBuf,
    },
}

/// Connection flags shared by every subcommand.
#[derive(Args)]
pub struct ConnectArgs {
    /// Remote host as [user@]host[:port]
    pub target: Target,

    /// Password for password authentication
    #[arg(long, env = "SSHFILE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// PEM-encoded RSA private key
    #[arg(short = 'i', long)]
    pub key: Option<PathBuf>,

    /// known_hosts file to check host keys against
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Accept only a host key with this SHA256 fingerprint
    #[arg(long, conflicts_with_all = ["insecure", "strict_host_key"])]
    pub fingerprint: Option<String>,

    /// Accept any host key
    #[arg(long, conflicts_with = "strict_host_key")]
    pub insecure: bool,

    /// Reject hosts missing from known_hosts instead of learning them
    #[arg(long)]
    pub strict_host_key: bool,

    /// Per-command timeout, e.g. "30s" or "2m"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

impl ConnectArgs {
    /// Host key policy selected by flags, if any.
    pub fn host_key_policy(&self) -> Option<HostKeyPolicy> {
        if let Some(fingerprint) = &self.fingerprint {
            Some(HostKeyPolicy::pinned(fingerprint.clone()))
        } else if self.insecure {
            Some(HostKeyPolicy::Insecure)
        } else if self.strict_host_key {
            Some(HostKeyPolicy::strict_known_hosts(self.known_hosts.clone()))
        } else {
            self.known_hosts
                .as_ref()
                .map(|path| HostKeyPolicy::KnownHosts {
                    path: Some(path.clone()),
                    trust_on_first_use: true,
                })
        }
    }

    /// Override profile values with flags given on the command line.
    pub fn apply(&self, mut config: ConnectionConfig) -> ConnectionConfig {
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(key) = &self.key {
            config.key_path = Some(key.clone());
        }
        if let Some(policy) = self.host_key_policy() {
            config.host_key = policy;
        }
        if let Some(timeout) = self.timeout {
            config.command_timeout = timeout;
        }
        config
    }
}
