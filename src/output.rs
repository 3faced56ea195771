// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use clap::ValueEnum;
use serde::Serialize;
use sshfile::diagnostics::Diagnostics;
use std::io::Write;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with timing
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Emit file content read from the remote host.
    ///
    /// Raw bytes go to stdout except in JSON mode, where the content is
    /// embedded (lossily, as UTF-8) in a `content` event.
    pub fn content(&self, content: &[u8]) -> std::io::Result<()> {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content)?;
                stdout.flush()
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "content",
                    message: &String::from_utf8_lossy(content),
                    bytes: Some(content.len() as u64),
                    duration_secs: self.duration(),
                };
                print_json(&event);
                Ok(())
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str, bytes: u64) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    bytes: Some(bytes),
                    duration_secs: self.duration(),
                };
                print_json(&event);
            }
        }
    }

    /// Report collected warnings.
    ///
    /// Outside JSON mode they have already been logged when recorded.
    pub fn warnings(&self, diag: &Diagnostics) {
        if self.mode != OutputMode::Json {
            return;
        }
        for warning in diag.warnings() {
            let event = JsonEvent {
                event: "warning",
                message: &warning.message,
                bytes: None,
                duration_secs: None,
            };
            print_json(&event);
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    bytes: None,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

fn print_json(event: &JsonEvent<'_>) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
