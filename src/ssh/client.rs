// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, host key policy, authentication, and command execution.

use super::auth::AuthMethod;
use super::exec::{CommandOutput, RemoteExec, bounded};
use crate::config::{ConnectionConfig, HostKeyPolicy, normalize_fingerprint};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl SshHandler {
    fn new(host: String, port: u16, policy: HostKeyPolicy) -> Self {
        Self { host, port, policy }
    }

    /// Decide whether to trust `server_public_key` under the configured policy.
    fn verify(&self, server_public_key: &ssh_key::PublicKey) -> bool {
        match &self.policy {
            HostKeyPolicy::Insecure => {
                tracing::warn!(
                    "accepting host key for {}:{} without verification",
                    self.host,
                    self.port
                );
                true
            }
            HostKeyPolicy::Fingerprint { fingerprint } => {
                let actual = server_public_key
                    .fingerprint(ssh_key::HashAlg::Sha256)
                    .to_string();
                let matches = normalize_fingerprint(&actual) == normalize_fingerprint(fingerprint);
                if !matches {
                    tracing::warn!(
                        expected = %fingerprint,
                        actual = %actual,
                        "host key fingerprint mismatch for {}:{}",
                        self.host,
                        self.port
                    );
                }
                matches
            }
            HostKeyPolicy::KnownHosts {
                path,
                trust_on_first_use,
            } => {
                let check_result = match path {
                    Some(path) => {
                        check_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => check_known_hosts(&self.host, self.port, server_public_key),
                };

                match check_result {
                    Ok(true) => true,
                    Ok(false) if *trust_on_first_use => {
                        // Host not in known_hosts
                        tracing::warn!(
                            "Trust-On-First-Use: accepting unknown host key for {}:{}",
                            self.host,
                            self.port
                        );
                        let learn_result = match path {
                            Some(path) => learn_known_hosts_path(
                                &self.host,
                                self.port,
                                server_public_key,
                                path,
                            ),
                            None => learn_known_hosts(&self.host, self.port, server_public_key),
                        };
                        if let Err(e) = learn_result {
                            tracing::warn!("Failed to save host key to known_hosts: {}", e);
                        }
                        true
                    }
                    Ok(false) => false,
                    Err(russh::keys::Error::KeyChanged { .. }) => {
                        tracing::warn!(
                            "host key for {}:{} does not match known_hosts",
                            self.host,
                            self.port
                        );
                        false
                    }
                    // Unreadable known_hosts: treat as unknown host
                    Err(_) => *trust_on_first_use,
                }
            }
        }
    }

    fn policy_name(&self) -> &'static str {
        match self.policy {
            HostKeyPolicy::KnownHosts { .. } => "known_hosts",
            HostKeyPolicy::Fingerprint { .. } => "fingerprint",
            HostKeyPolicy::Insecure => "insecure",
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.verify(server_public_key))
    }
}

/// An established, authenticated SSH connection.
///
/// Every command runs on its own session channel, which is closed when the
/// command finishes. Call [`Session::close`] when done; dropping the session
/// also tears the connection down.
pub struct Session {
    handle: Handle<SshHandler>,
    command_timeout: Duration,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &"<russh::Handle>")
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl Session {
    /// Dial `config.host`, verify its key, and authenticate with `methods`
    /// in order.
    pub async fn connect(
        config: &ConnectionConfig,
        methods: &[AuthMethod],
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let handle = bounded(
            Self::connect_inner(config, methods),
            config.connect_timeout,
            cancel,
        )
        .await?;

        Ok(Self {
            handle,
            command_timeout: config.command_timeout,
            cancel: cancel.clone(),
        })
    }

    async fn connect_inner(
        config: &ConnectionConfig,
        methods: &[AuthMethod],
    ) -> Result<Handle<SshHandler>> {
        let port = config.effective_port();

        let russh_config = Config {
            keepalive_interval: Some(Duration::from_secs(15)),
            ..Default::default()
        };

        let handler = SshHandler::new(config.host.clone(), port, config.host_key.clone());
        let policy = handler.policy_name();

        tracing::debug!(host = %config.host, port, "connecting");
        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), port),
            handler,
        )
        .await
        .map_err(|e| match e {
            russh::Error::UnknownKey => Error::Connection(format!(
                "host key for {}:{} rejected by {} policy",
                config.host, port, policy
            )),
            e => Error::Connection(e.to_string()),
        })?;

        if Self::authenticate(&mut handle, &config.user, methods).await? {
            return Ok(handle);
        }

        let _ = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await;
        Err(Error::Connection(format!(
            "unable to authenticate as {}, attempted methods {:?}",
            config.user, methods
        )))
    }

    /// Try each method in order; true once the server accepts one.
    async fn authenticate(
        handle: &mut Handle<SshHandler>,
        user: &str,
        methods: &[AuthMethod],
    ) -> Result<bool> {
        for method in methods {
            let result = match method {
                AuthMethod::PublicKey(key) => {
                    let hash_alg = handle
                        .best_supported_rsa_hash()
                        .await
                        .map_err(|e| Error::Connection(e.to_string()))?
                        .flatten();
                    handle
                        .authenticate_publickey(
                            user,
                            PrivateKeyWithHashAlg::new(Arc::clone(key), hash_alg),
                        )
                        .await
                }
                AuthMethod::Password(password) => {
                    handle.authenticate_password(user, password).await
                }
            }
            .map_err(|e| Error::Connection(e.to_string()))?;

            if result.success() {
                tracing::debug!(method = method.name(), "authenticated");
                return Ok(true);
            }
            tracing::debug!(method = method.name(), "authentication method rejected");
        }
        Ok(false)
    }

    /// Execute a command, bounded by the command timeout and the
    /// session's cancellation token.
    pub async fn run(&self, command: &str) -> Result<CommandOutput> {
        bounded(self.exec_inner(command), self.command_timeout, &self.cancel).await
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Session(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Session(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // An abnormal termination (connection loss, killed by signal)
        // never reports an exit status.
        if !got_exit_status {
            return Err(Error::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    /// Disconnect, recording a warning instead of failing.
    pub async fn close(self, diag: &mut Diagnostics) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            diag.warn(Warning::disconnect(format!("failed to disconnect: {}", e)));
        }
    }
}

#[async_trait]
impl RemoteExec for Session {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        self.run(command).await
    }
}
