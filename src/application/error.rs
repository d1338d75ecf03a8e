//! Errors surfaced by the relay core.

use crate::domain::foundation::{ConnectionId, ErrorCode};

/// Errors returned by subscription operations.
///
/// Upstream failures are deliberately absent: they are logged and leave the
/// channel Inactive instead of failing the local subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The connection was never registered or has already disconnected.
    #[error("Connection {0} is not registered")]
    NotConnected(ConnectionId),

    /// The relay is shutting down and accepts no new subscriptions.
    #[error("Relay is shutting down")]
    ShuttingDown,
}

impl RelayError {
    /// Wire error code for client-facing error frames.
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayError::NotConnected(_) => ErrorCode::NotConnected,
            RelayError::ShuttingDown => ErrorCode::ShuttingDown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_wire_names() {
        assert_eq!(RelayError::ShuttingDown.code().as_str(), "SHUTTING_DOWN");
        assert_eq!(
            RelayError::NotConnected(ConnectionId::new()).code().as_str(),
            "NOT_CONNECTED"
        );
    }
}
