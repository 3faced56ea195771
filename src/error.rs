// ABOUTME: Error types for sshfile.
// ABOUTME: Uses thiserror; every failure surfaces as a human-readable message.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key format: {0}")]
    Format(String),

    #[error("unsupported key type: {0} (only RSA keys are accepted)")]
    UnsupportedKeyType(String),

    #[error("no authentication method provided")]
    NoAuthMethod,

    #[error("failed to connect: {0}")]
    Connection(String),

    #[error("failed to create session: {0}")]
    Session(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("failed to read file: {0}")]
    Read(String),

    #[error("failed to write file: {0}")]
    Write(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that end an operation outright: they are never wrapped into
    /// `Read`/`Write` and no fallback strategy is attempted after them.
    pub fn aborts_operation(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Cancelled | Error::Session(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
