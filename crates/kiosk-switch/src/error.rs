//! Error types for switch configuration operations.

use kiosk_terminal::TerminalError;
use thiserror::Error;

/// Result type alias for switch operations.
pub type SwitchResult<T> = Result<T, SwitchError>;

/// Errors raised by the switch configurator.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// The underlying console session failed.
    #[error(transparent)]
    Terminal(#[from] TerminalError),

    /// VLAN creation or verification failed; port binding cannot proceed.
    #[error("VLAN {vlan} could not be created or verified")]
    VlanUnavailable {
        /// The VLAN id that was requested.
        vlan: String,
    },

    /// A port command sequence failed or its result could not be verified.
    #[error("port operation failed on {port}: {message}")]
    PortOperationFailed {
        /// The port the sequence targeted.
        port: String,
        /// What went wrong.
        message: String,
    },
}

impl SwitchError {
    /// Creates a VLAN-unavailable error.
    pub fn vlan_unavailable(vlan: impl Into<String>) -> Self {
        Self::VlanUnavailable { vlan: vlan.into() }
    }

    /// Creates a port-operation error.
    pub fn port_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PortOperationFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// True if the error means the console link itself is down, as
    /// opposed to a device-side refusal.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, SwitchError::Terminal(TerminalError::NotConnected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SwitchError::vlan_unavailable("50");
        assert_eq!(err.to_string(), "VLAN 50 could not be created or verified");

        let err = SwitchError::port_failed("Gi1/0/10", "timeout");
        assert!(err.to_string().contains("Gi1/0/10"));
    }

    #[test]
    fn test_is_disconnected() {
        let err = SwitchError::Terminal(TerminalError::NotConnected);
        assert!(err.is_disconnected());
        assert!(!SwitchError::vlan_unavailable("50").is_disconnected());
    }
}
