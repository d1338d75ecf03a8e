//! HTTP DTOs for the publish endpoint.

use serde::Serialize;

use crate::application::PublishReport;
use crate::domain::foundation::{ChannelName, ErrorCode, EventName};

/// Result of a successful publish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub channel: ChannelName,
    pub event_name: EventName,
    /// Channel members that received the typed event.
    pub delivered: usize,
}

impl PublishResponse {
    pub fn new(channel: ChannelName, event_name: EventName, report: PublishReport) -> Self {
        Self {
            channel,
            event_name,
            delivered: report.channel_deliveries,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
        }
    }

    pub fn malformed_json() -> Self {
        Self::new(ErrorCode::MalformedJson, "Malformed JSON")
    }
}
