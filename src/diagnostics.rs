// ABOUTME: Diagnostics accumulator for non-fatal warnings during an operation.
// ABOUTME: Collects warnings that shouldn't fail a read or write but should be visible.

/// Collects non-fatal warnings during one remote file operation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if a warning of the given kind was collected.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during an operation.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a skipped-key warning.
    pub fn key_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::KeySkipped,
            message: message.into(),
        }
    }

    /// Create a write-fallback warning.
    pub fn write_fallback(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::WriteFallback,
            message: message.into(),
        }
    }

    /// Create an SSH disconnect warning.
    pub fn disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Disconnect,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The private key could not be loaded; it contributed no auth method.
    KeySkipped,
    /// The base64 write failed and the here-document fallback was used.
    WriteFallback,
    /// Failed to cleanly disconnect the SSH session.
    Disconnect,
}
