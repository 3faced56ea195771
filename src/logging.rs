// ABOUTME: tracing subscriber setup for the CLI and for library callers.
// ABOUTME: Library logging goes to stderr, filtered by SSHFILE_LOG.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the library's log filter.
pub const LOG_ENV: &str = "SSHFILE_LOG";

static LIBRARY_INIT: Once = Once::new();

/// Install a stderr subscriber for calls made through the C ABI.
///
/// Safe to call on every entry; a subscriber already installed by the host
/// process is left alone.
pub fn init_library_logging() {
    LIBRARY_INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .ok();
    });
}

/// Install the CLI subscriber: `debug` when verbose, otherwise `warn`.
pub fn init_cli_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
