//! WebSocket frame protocol.
//!
//! Every frame in either direction is a JSON text frame shaped
//! `{ "event": <name>, "data": <value> }`:
//! - Server → Client: published events (`channel:eventName` and `all`),
//!   upstream `notification`s, `connected`, subscription acknowledgements,
//!   `error` and `pong`
//! - Client → Server: `subscribe`, `unsubscribe`, `ping`

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::Delivery;
use crate::domain::foundation::{ChannelName, ConnectionId, ErrorCode, Timestamp};
use crate::domain::relay::EventEnvelope;

// ============================================
// Server → Client Messages
// ============================================

/// A frame sent from server to client.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    pub event: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ServerData>,
}

/// Payload of a [`ServerMessage`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerData {
    /// `{channel, eventName, data}` envelope of a published event.
    Event(Arc<EventEnvelope>),
    /// Parsed upstream notification payload, forwarded as-is.
    Notification(Arc<serde_json::Value>),
    Connected(ConnectedMessage),
    Channel(ChannelMessage),
    Error(ErrorMessage),
}

/// Greeting sent on connect when no upstream source is configured.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: String,
    pub timestamp: String,
}

/// Acknowledgement of a subscribe or unsubscribe.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelMessage {
    pub channel: ChannelName,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

impl ServerMessage {
    pub const CONNECTED: &'static str = "connected";
    pub const NOTIFICATION: &'static str = "notification";
    pub const SUBSCRIBED: &'static str = "subscribed";
    pub const UNSUBSCRIBED: &'static str = "unsubscribed";
    pub const ERROR: &'static str = "error";
    pub const PONG: &'static str = "pong";

    fn new(event: &str, data: Option<ServerData>) -> Self {
        Self {
            event: Arc::from(event),
            data,
        }
    }

    pub fn connected(connection_id: &ConnectionId, at: Timestamp) -> Self {
        Self::new(
            Self::CONNECTED,
            Some(ServerData::Connected(ConnectedMessage {
                connection_id: connection_id.to_string(),
                timestamp: at.to_rfc3339(),
            })),
        )
    }

    pub fn subscribed(channel: ChannelName) -> Self {
        Self::new(
            Self::SUBSCRIBED,
            Some(ServerData::Channel(ChannelMessage { channel })),
        )
    }

    pub fn unsubscribed(channel: ChannelName) -> Self {
        Self::new(
            Self::UNSUBSCRIBED,
            Some(ServerData::Channel(ChannelMessage { channel })),
        )
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            Self::ERROR,
            Some(ServerData::Error(ErrorMessage {
                code: code.as_str().to_string(),
                message: message.into(),
            })),
        )
    }

    pub fn pong() -> Self {
        Self::new(Self::PONG, None)
    }
}

impl From<&Delivery> for ServerMessage {
    fn from(delivery: &Delivery) -> Self {
        match delivery {
            Delivery::Event { name, envelope } => Self {
                event: name.clone(),
                data: Some(ServerData::Event(envelope.clone())),
            },
            Delivery::Notification { data, .. } => Self::new(
                Self::NOTIFICATION,
                Some(ServerData::Notification(data.clone())),
            ),
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a channel room.
    Subscribe(ChannelName),
    /// Leave a channel room.
    Unsubscribe(ChannelName),
    /// Heartbeat; answered with `pong`.
    Ping,
}
