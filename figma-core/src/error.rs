//! Error types for relay operations.

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while relaying a command to the Figma plugin.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No plugin has announced itself, or the last one disconnected.
    #[error("No active Figma plugin connection")]
    NoConnection,

    /// The plugin did not answer within the command timeout.
    #[error("Command {command} timed out")]
    Timeout {
        /// Command name.
        command: String,
    },

    /// The connection carrying the command closed before a response arrived.
    #[error("Connection to Figma plugin closed before {command} completed")]
    ConnectionClosed {
        /// Command name.
        command: String,
    },

    /// The plugin answered with `success: false`.
    #[error("{0}")]
    Plugin(String),

    /// Command serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Returns true when the failure is about the transport rather than
    /// the command itself.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NoConnection | Self::Timeout { .. } | Self::ConnectionClosed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_command() {
        let err = RelayError::Timeout {
            command: "get-selection".into(),
        };
        assert_eq!(err.to_string(), "Command get-selection timed out");
        assert!(err.is_transport());
    }

    #[test]
    fn plugin_error_is_passed_through_verbatim() {
        let err = RelayError::Plugin("Node 1:2 not found".into());
        assert_eq!(err.to_string(), "Node 1:2 not found");
        assert!(!err.is_transport());
    }
}
