// ABOUTME: Host key verification policy for SSH connections.
// ABOUTME: known_hosts (optionally trust-on-first-use), pinned fingerprint, or insecure.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case", deny_unknown_fields)]
pub enum HostKeyPolicy {
    /// Check the server key against a known_hosts file.
    KnownHosts {
        /// If None, uses the default ~/.ssh/known_hosts.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Accept and record keys of hosts not yet in the file.
        #[serde(default = "default_trust_on_first_use")]
        trust_on_first_use: bool,
    },
    /// Accept only a key whose SHA256 fingerprint matches.
    Fingerprint { fingerprint: String },
    /// Accept any server key.
    Insecure,
}

fn default_trust_on_first_use() -> bool {
    true
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        HostKeyPolicy::KnownHosts {
            path: None,
            trust_on_first_use: true,
        }
    }
}

impl HostKeyPolicy {
    pub fn strict_known_hosts(path: Option<PathBuf>) -> Self {
        HostKeyPolicy::KnownHosts {
            path,
            trust_on_first_use: false,
        }
    }

    pub fn pinned(fingerprint: impl Into<String>) -> Self {
        HostKeyPolicy::Fingerprint {
            fingerprint: fingerprint.into(),
        }
    }
}

/// Normalize a fingerprint for comparison: accepts `SHA256:xxx` or bare `xxx`,
/// ignores surrounding whitespace and base64 padding.
pub(crate) fn normalize_fingerprint(fp: &str) -> &str {
    let fp = fp.trim();
    let fp = fp.strip_prefix("SHA256:").unwrap_or(fp);
    fp.trim_end_matches('=')
}
