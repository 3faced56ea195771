// ABOUTME: Connection configuration and YAML profiles for sshfile.
// ABOUTME: Builds the per-operation ConnectionConfig from profiles, targets, and flags.

mod env_value;
mod host_key;
mod target;

pub use env_value::EnvValue;
pub use host_key::HostKeyPolicy;
pub(crate) use host_key::normalize_fingerprint;
pub use target::Target;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22;
pub const PROFILE_FILENAME: &str = "sshfile.yml";
pub const PROFILE_FILENAME_ALT: &str = "sshfile.yaml";

/// Everything needed for one remote read or write.
///
/// A config describes exactly one operation and is not reused across calls.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub key_path: Option<PathBuf>,
    /// SSH port; 0 means the default port 22.
    pub port: u16,
    pub remote_path: String,
    pub host_key: HostKeyPolicy,
    /// Bound on dialing, handshake, and authentication.
    pub connect_timeout: Duration,
    /// Bound on each remote command.
    pub command_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: None,
            key_path: None,
            port: 0,
            remote_path: remote_path.into(),
            host_key: HostKeyPolicy::default(),
            connect_timeout: default_connect_timeout(),
            command_timeout: default_command_timeout(),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn host_key(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key = policy;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn remote_path(mut self, path: impl Into<String>) -> Self {
        self.remote_path = path.into();
        self
    }

    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// `ssh://user@host[:port]/path`, with the port omitted when it is 22.
    pub fn display_uri(&self) -> String {
        let mut uri = format!("ssh://{}@{}", self.user, self.host);
        if self.effective_port() != DEFAULT_PORT {
            uri.push_str(&format!(":{}", self.effective_port()));
        }
        if !self.remote_path.starts_with('/') {
            uri.push('/');
        }
        uri.push_str(&self.remote_path);
        uri
    }

    /// Reject configs missing a field every operation needs.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host is required".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(Error::InvalidConfig("user is required".to_string()));
        }
        if self.remote_path.is_empty() {
            return Err(Error::InvalidConfig("remote path is required".to_string()));
        }
        if let HostKeyPolicy::Fingerprint { fingerprint } = &self.host_key
            && fingerprint.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "pinned host key fingerprint is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_path", &self.key_path)
            .field("port", &self.port)
            .field("remote_path", &self.remote_path)
            .field("host_key", &self.host_key)
            .field("connect_timeout", &self.connect_timeout)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

pub fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

pub fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Connection defaults stored in `sshfile.yml`.
///
/// The host always comes from the command-line target, so a profile has no
/// `host` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    #[serde(default)]
    pub key_path: Option<PathBuf>,

    #[serde(default)]
    pub host_key: Option<HostKeyPolicy>,

    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,
}

impl Profile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Profile::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Load the first profile file found in `dir`, if any.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let candidates = [dir.join(PROFILE_FILENAME), dir.join(PROFILE_FILENAME_ALT)];

        for path in &candidates {
            if path.exists() {
                return Self::load(path).map(Some);
            }
        }
        Ok(None)
    }

    /// Merge this profile with a command-line target into a config.
    ///
    /// Target values win over profile values. The user falls back to `$USER`.
    pub fn connection_config(
        &self,
        target: &Target,
        remote_path: impl Into<String>,
    ) -> Result<ConnectionConfig> {
        let user = target
            .user
            .clone()
            .or_else(|| self.user.clone())
            .or_else(|| std::env::var("USER").ok())
            .ok_or_else(|| Error::InvalidConfig("no user given".to_string()))?;

        let port = target.port.or(self.port).unwrap_or(DEFAULT_PORT);

        let mut config = ConnectionConfig::new(target.host.clone(), user, remote_path).port(port);

        if let Some(password) = &self.password {
            config.password = Some(password.resolve()?);
        }
        if let Some(key_path) = &self.key_path {
            config.key_path = Some(expand_home(key_path));
        }
        if let Some(policy) = &self.host_key {
            config.host_key = policy.clone();
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = self.command_timeout {
            config.command_timeout = timeout;
        }
        Ok(config)
    }
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
