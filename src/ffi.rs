// ABOUTME: C ABI for reading and writing remote files.
// ABOUTME: Every returned SshFileResult is owned by the caller until ReleaseResult.

//! Foreign call boundary.
//!
//! Ownership contract:
//!
//! * Input strings are borrowed for the duration of the call only.
//! * Each `*Remote*` call returns a heap-allocated [`SshFileResult`] (never
//!   NULL). The result and every string it points to belong to the library
//!   and must be released with exactly one [`ReleaseResult`] call. Using a
//!   result after release, or releasing it twice, is undefined behavior.
//! * Cancel tokens from [`NewCancelToken`] must outlive every call using them
//!   and are freed with [`ReleaseCancelToken`].
//!
//! Calls keep no state between invocations and may run concurrently from
//! different threads. Each call blocks the calling thread on its own runtime.

#![allow(non_snake_case)]

use crate::config::{ConnectionConfig, HostKeyPolicy};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::logging;
use crate::transfer;
use std::ffi::{CStr, CString, c_char, c_int, c_uint};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Check the known_hosts file, learning keys of unknown hosts.
pub const SSHFILE_HOST_KEY_TRUST_ON_FIRST_USE: c_int = 0;
/// Check the known_hosts file, rejecting unknown hosts.
pub const SSHFILE_HOST_KEY_STRICT: c_int = 1;
/// Accept only the key matching `host_key_fingerprint`.
pub const SSHFILE_HOST_KEY_FINGERPRINT: c_int = 2;
/// Accept any host key.
pub const SSHFILE_HOST_KEY_INSECURE: c_int = 3;

/// Connection parameters as passed by the caller.
///
/// NULL and empty strings are both treated as absent for the optional
/// fields.
#[repr(C)]
pub struct SshFileConfig {
    pub host: *const c_char,
    pub user: *const c_char,
    /// Optional.
    pub password: *const c_char,
    /// Optional path to a PEM-encoded RSA private key.
    pub key_path: *const c_char,
    /// 0 means 22.
    pub port: c_int,
    pub remote_path: *const c_char,
    /// One of the `SSHFILE_HOST_KEY_*` constants.
    pub host_key_policy: c_int,
    /// Optional; defaults to ~/.ssh/known_hosts.
    pub known_hosts_path: *const c_char,
    /// Required for `SSHFILE_HOST_KEY_FINGERPRINT`, e.g. `SHA256:...`.
    pub host_key_fingerprint: *const c_char,
    /// Per-command timeout in milliseconds; 0 uses the default.
    pub timeout_ms: c_uint,
}

/// Outcome of one operation.
///
/// On success `error` is NULL and `content` holds the file content for reads
/// (NUL-terminated, `content_len` bytes excluding the terminator; the content
/// itself may contain NUL bytes) or NULL for writes. On failure `content` is
/// NULL and `error` is a non-empty message.
#[repr(C)]
pub struct SshFileResult {
    pub success: c_int,
    pub content: *mut c_char,
    pub content_len: usize,
    pub error: *mut c_char,
}

/// Handle used to cancel in-flight operations from another thread.
pub struct SshFileCancelToken {
    token: CancellationToken,
}

impl SshFileResult {
    fn ok(content: Option<Vec<u8>>) -> *mut SshFileResult {
        let (content, content_len) = match content {
            Some(bytes) => into_raw_bytes(bytes),
            None => (ptr::null_mut(), 0),
        };
        Box::into_raw(Box::new(SshFileResult {
            success: 1,
            content,
            content_len,
            error: ptr::null_mut(),
        }))
    }

    fn err(message: &str) -> *mut SshFileResult {
        let message = if message.is_empty() {
            "unknown error"
        } else {
            message
        };
        let error = CString::new(message.replace('\0', " "))
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut());
        Box::into_raw(Box::new(SshFileResult {
            success: 0,
            content: ptr::null_mut(),
            content_len: 0,
            error,
        }))
    }
}

/// Leak `bytes` plus a NUL terminator as a C buffer.
fn into_raw_bytes(mut bytes: Vec<u8>) -> (*mut c_char, usize) {
    let len = bytes.len();
    bytes.push(0);
    let raw = Box::into_raw(bytes.into_boxed_slice());
    (raw as *mut u8 as *mut c_char, len)
}

/// Free a buffer from [`into_raw_bytes`].
///
/// # Safety
/// `ptr` and `len` must come from one `into_raw_bytes` call.
unsafe fn free_raw_bytes(ptr: *mut c_char, len: usize) {
    let slice = ptr::slice_from_raw_parts_mut(ptr as *mut u8, len + 1);
    drop(unsafe { Box::from_raw(slice) });
}

/// # Safety
/// `ptr` must be NULL or a valid NUL-terminated string.
unsafe fn required_str(ptr: *const c_char, field: &str) -> Result<String> {
    if ptr.is_null() {
        return Err(Error::InvalidConfig(format!("{} is NULL", field)));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(str::to_string)
        .map_err(|_| Error::InvalidConfig(format!("{} is not valid UTF-8", field)))
}

/// # Safety
/// `ptr` must be NULL or a valid NUL-terminated string.
unsafe fn optional_str(ptr: *const c_char, field: &str) -> Result<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }
    let s = unsafe { required_str(ptr, field) }?;
    Ok(Some(s).filter(|s| !s.is_empty()))
}

impl SshFileConfig {
    /// # Safety
    /// Every non-NULL string field must be a valid NUL-terminated string.
    unsafe fn to_connection_config(&self) -> Result<ConnectionConfig> {
        let host = unsafe { required_str(self.host, "host") }?;
        let user = unsafe { required_str(self.user, "user") }?;
        let remote_path = unsafe { required_str(self.remote_path, "remote_path") }?;

        let port = u16::try_from(self.port)
            .map_err(|_| Error::InvalidConfig(format!("port {} out of range", self.port)))?;

        let mut config = ConnectionConfig::new(host, user, remote_path).port(port);
        config.password = unsafe { optional_str(self.password, "password") }?;
        config.key_path = unsafe { optional_str(self.key_path, "key_path") }?.map(PathBuf::from);
        config.host_key = unsafe { self.host_key_policy() }?;
        if self.timeout_ms > 0 {
            config.command_timeout = Duration::from_millis(u64::from(self.timeout_ms));
        }
        Ok(config)
    }

    /// # Safety
    /// As for [`SshFileConfig::to_connection_config`].
    unsafe fn host_key_policy(&self) -> Result<HostKeyPolicy> {
        let known_hosts =
            unsafe { optional_str(self.known_hosts_path, "known_hosts_path") }?.map(PathBuf::from);
        match self.host_key_policy {
            SSHFILE_HOST_KEY_TRUST_ON_FIRST_USE => Ok(HostKeyPolicy::KnownHosts {
                path: known_hosts,
                trust_on_first_use: true,
            }),
            SSHFILE_HOST_KEY_STRICT => Ok(HostKeyPolicy::strict_known_hosts(known_hosts)),
            SSHFILE_HOST_KEY_FINGERPRINT => {
                unsafe { optional_str(self.host_key_fingerprint, "host_key_fingerprint") }?
                    .map(HostKeyPolicy::pinned)
                    .ok_or_else(|| {
                        Error::InvalidConfig(
                            "host_key_fingerprint is required for the fingerprint policy"
                                .to_string(),
                        )
                    })
            }
            SSHFILE_HOST_KEY_INSECURE => Ok(HostKeyPolicy::Insecure),
            other => Err(Error::InvalidConfig(format!(
                "unknown host_key_policy {}",
                other
            ))),
        }
    }
}

/// # Safety
/// `config` must be NULL or point to a valid `SshFileConfig`.
unsafe fn read_config(config: *const SshFileConfig) -> Result<ConnectionConfig> {
    match unsafe { config.as_ref() } {
        Some(config) => unsafe { config.to_connection_config() },
        None => Err(Error::InvalidConfig("config is NULL".to_string())),
    }
}

/// # Safety
/// `token` must be NULL or a live token from [`NewCancelToken`].
unsafe fn cancel_token(token: *const SshFileCancelToken) -> CancellationToken {
    match unsafe { token.as_ref() } {
        Some(handle) => handle.token.clone(),
        None => CancellationToken::new(),
    }
}

/// Run one operation on a fresh single-threaded runtime.
fn block_on<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;
    runtime.block_on(fut)
}

/// Turn an operation's outcome into an owned result, catching panics so
/// they never unwind into the caller.
fn complete(op: impl FnOnce() -> Result<Option<Vec<u8>>>) -> *mut SshFileResult {
    logging::init_library_logging();
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(content)) => SshFileResult::ok(content),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "operation failed");
            SshFileResult::err(&e.to_string())
        }
        Err(_) => SshFileResult::err("internal error: operation panicked"),
    }
}

/// Read `config->remote_path`.
///
/// # Safety
/// `config` must be NULL or point to a valid `SshFileConfig`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ReadRemoteFile(config: *const SshFileConfig) -> *mut SshFileResult {
    unsafe { ReadRemoteFileWithCancel(config, ptr::null()) }
}

/// Read `config->remote_path`, stopping early if `token` is cancelled.
///
/// # Safety
/// `config` must be NULL or point to a valid `SshFileConfig`; `token` must be
/// NULL or a live token.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ReadRemoteFileWithCancel(
    config: *const SshFileConfig,
    token: *const SshFileCancelToken,
) -> *mut SshFileResult {
    complete(|| {
        let config = unsafe { read_config(config) }?;
        let cancel = unsafe { cancel_token(token) };
        let mut diag = Diagnostics::default();
        block_on(transfer::read_remote_file(&config, &cancel, &mut diag)).map(Some)
    })
}

/// Replace the content of `config->remote_path` with `content`.
///
/// # Safety
/// `config` must be NULL or point to a valid `SshFileConfig`; `content` must
/// be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WriteRemoteFile(
    config: *const SshFileConfig,
    content: *const c_char,
) -> *mut SshFileResult {
    unsafe { WriteRemoteFileWithCancel(config, content, ptr::null()) }
}

/// Like [`WriteRemoteFile`], stopping early if `token` is cancelled.
///
/// # Safety
/// As for [`WriteRemoteFile`]; `token` must be NULL or a live token.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WriteRemoteFileWithCancel(
    config: *const SshFileConfig,
    content: *const c_char,
    token: *const SshFileCancelToken,
) -> *mut SshFileResult {
    complete(|| {
        let config = unsafe { read_config(config) }?;
        if content.is_null() {
            return Err(Error::InvalidConfig("content is NULL".to_string()));
        }
        let content = unsafe { CStr::from_ptr(content) }.to_bytes();
        let cancel = unsafe { cancel_token(token) };
        let mut diag = Diagnostics::default();
        block_on(transfer::write_remote_file(&config, content, &cancel, &mut diag)).map(|_| None)
    })
}

/// Copy the local file `local_path` to `config->remote_path`.
///
/// # Safety
/// `config` must be NULL or point to a valid `SshFileConfig`; `local_path`
/// must be NULL or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn UploadRemoteFile(
    config: *const SshFileConfig,
    local_path: *const c_char,
) -> *mut SshFileResult {
    complete(|| {
        let config = unsafe { read_config(config) }?;
        let local_path = PathBuf::from(unsafe { required_str(local_path, "local_path") }?);
        let mut diag = Diagnostics::default();
        block_on(transfer::upload_file(
            &config,
            &local_path,
            &CancellationToken::new(),
            &mut diag,
        ))
        .map(|_| None)
    })
}

/// Copy `config->remote_path` to the local file `local_path`.
///
/// # Safety
/// As for [`UploadRemoteFile`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn DownloadRemoteFile(
    config: *const SshFileConfig,
    local_path: *const c_char,
) -> *mut SshFileResult {
    complete(|| {
        let config = unsafe { read_config(config) }?;
        let local_path = PathBuf::from(unsafe { required_str(local_path, "local_path") }?);
        let mut diag = Diagnostics::default();
        block_on(transfer::download_file(
            &config,
            &local_path,
            &CancellationToken::new(),
            &mut diag,
        ))
        .map(|_| None)
    })
}

/// Free a result and all strings it owns. NULL is ignored.
///
/// # Safety
/// `result` must be NULL or a pointer returned by this library that has not
/// been released yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ReleaseResult(result: *mut SshFileResult) {
    if result.is_null() {
        return;
    }
    let result = unsafe { Box::from_raw(result) };
    if !result.content.is_null() {
        unsafe { free_raw_bytes(result.content, result.content_len) };
    }
    if !result.error.is_null() {
        drop(unsafe { CString::from_raw(result.error) });
    }
}

/// Create a cancel token for the `*WithCancel` calls.
#[unsafe(no_mangle)]
pub extern "C" fn NewCancelToken() -> *mut SshFileCancelToken {
    Box::into_raw(Box::new(SshFileCancelToken {
        token: CancellationToken::new(),
    }))
}

/// Cancel every operation using `token`. Safe to call from any thread.
///
/// # Safety
/// `token` must be NULL or a live token.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CancelOperation(token: *const SshFileCancelToken) {
    if let Some(handle) = unsafe { token.as_ref() } {
        handle.token.cancel();
    }
}

/// Free a cancel token. NULL is ignored.
///
/// # Safety
/// `token` must be NULL or a live token no longer used by any call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ReleaseCancelToken(token: *mut SshFileCancelToken) {
    if !token.is_null() {
        drop(unsafe { Box::from_raw(token) });
    }
}
