// ABOUTME: Library root for sshfile - remote file read/write over SSH.
// ABOUTME: The C ABI lives in ffi; the CLI binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod remote;
pub mod ssh;
pub mod transfer;
