//! Error types for serial console sessions.

use std::io;
use thiserror::Error;

/// Result type alias for terminal session operations.
pub type TerminalResult<T> = Result<T, TerminalError>;

/// Errors raised by the serial console session.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// No open transport.
    #[error("not connected to the switch console")]
    NotConnected,

    /// Opening the serial device failed.
    #[error("failed to open serial device '{device}': {message}")]
    OpenFailed {
        /// The device path that was attempted.
        device: String,
        /// Error message from the serial layer.
        message: String,
    },

    /// Transport-level read/write failure.
    #[error("serial I/O failed during {operation}: {source}")]
    Io {
        /// The operation that failed ("write", "read", "flush").
        operation: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The prompt returned by the device matched no known CLI mode.
    #[error("CLI mode not recognized from prompt {prompt:?}")]
    ModeUnknown {
        /// Tail of the response that was inspected.
        prompt: String,
    },

    /// The device asked for an enable password and none was configured.
    #[error("enable password required but not configured")]
    EnablePasswordRequired,

    /// "enable" did not land in privileged EXEC mode.
    #[error("failed to enter privileged EXEC mode")]
    EnableFailed,

    /// "configure terminal" did not land in global configuration mode.
    #[error("failed to enter global configuration mode")]
    ConfigModeFailed,
}

impl TerminalError {
    /// Creates an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Creates a mode-unknown error carrying the offending prompt tail.
    pub fn mode_unknown(prompt: impl Into<String>) -> Self {
        Self::ModeUnknown {
            prompt: prompt.into(),
        }
    }

    /// Returns true if the error invalidates the cached CLI mode,
    /// forcing a re-probe before the next command.
    pub fn invalidates_mode(&self) -> bool {
        matches!(
            self,
            TerminalError::NotConnected
                | TerminalError::Io { .. }
                | TerminalError::ModeUnknown { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TerminalError::NotConnected;
        assert_eq!(err.to_string(), "not connected to the switch console");

        let err = TerminalError::mode_unknown("Switch%");
        assert!(err.to_string().contains("Switch%"));
    }

    #[test]
    fn test_invalidates_mode() {
        assert!(TerminalError::NotConnected.invalidates_mode());
        assert!(TerminalError::mode_unknown("?").invalidates_mode());
        assert!(!TerminalError::EnablePasswordRequired.invalidates_mode());
        assert!(!TerminalError::ConfigModeFailed.invalidates_mode());
    }
}
