// ABOUTME: Authentication method resolution from the available credentials.
// ABOUTME: Key first, password second; a broken key is skipped with a warning.

use super::key::{load_private_key, to_ssh_key};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use russh::keys::ssh_key;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A credential the session will offer to the server.
#[derive(Clone)]
pub enum AuthMethod {
    PublicKey(Arc<ssh_key::PrivateKey>),
    Password(String),
}

impl AuthMethod {
    /// The SSH method name, as used in protocol messages.
    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::PublicKey(_) => "publickey",
            AuthMethod::Password(_) => "password",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the ordered list of methods to try.
///
/// Failures loading the key are absorbed: they add no method and leave a
/// `KeySkipped` warning, so a password can still be used. Returns
/// `NoAuthMethod` when nothing usable remains.
pub fn resolve_auth_methods(
    key_path: Option<&Path>,
    password: Option<&str>,
    diag: &mut Diagnostics,
) -> Result<Vec<AuthMethod>> {
    let mut methods = Vec::with_capacity(2);

    if let Some(path) = key_path.filter(|p| !p.as_os_str().is_empty()) {
        match load_private_key(path).and_then(|key| to_ssh_key(&key)) {
            Ok(key) => {
                tracing::debug!(path = %path.display(), "loaded private key");
                methods.push(AuthMethod::PublicKey(Arc::new(key)));
            }
            Err(e) => diag.warn(Warning::key_skipped(format!(
                "skipping private key {}: {}",
                path.display(),
                e
            ))),
        }
    }

    if let Some(password) = password.filter(|p| !p.is_empty()) {
        methods.push(AuthMethod::Password(password.to_string()));
    }

    if methods.is_empty() {
        return Err(Error::NoAuthMethod);
    }
    Ok(methods)
}
