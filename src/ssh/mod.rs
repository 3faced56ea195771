// ABOUTME: SSH client module for remote file access.
// ABOUTME: Key loading, auth method resolution, sessions, and the command-exec seam.

mod auth;
mod client;
mod exec;
mod key;

pub use auth::{AuthMethod, resolve_auth_methods};
pub use client::Session;
pub use exec::{CommandOutput, RemoteExec, bounded};
pub use key::{load_private_key, parse_private_key, to_ssh_key};
