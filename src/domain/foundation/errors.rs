//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Machine-readable error codes surfaced to HTTP and WebSocket clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedJson,
    InvalidChannel,
    InvalidEventName,
    InvalidMessage,
    NotConnected,
    ShuttingDown,
    UpstreamUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Wire representation, e.g. `MALFORMED_JSON`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedJson => "MALFORMED_JSON",
            ErrorCode::InvalidChannel => "INVALID_CHANNEL",
            ErrorCode::InvalidEventName => "INVALID_EVENT_NAME",
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::ShuttingDown => "SHUTTING_DOWN",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("channel");
        assert_eq!(format!("{}", err), "Field 'channel' cannot be empty");
    }

    #[test]
    fn validation_error_invalid_format_displays_correctly() {
        let err = ValidationError::invalid_format("channel", "must not contain ':' or NUL");
        assert_eq!(
            format!("{}", err),
            "Field 'channel' has invalid format: must not contain ':' or NUL"
        );
    }

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::MalformedJson), "MALFORMED_JSON");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }
}
