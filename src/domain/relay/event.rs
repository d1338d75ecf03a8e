//! Event model for published and bridged events.

use serde::Serialize;

use crate::domain::foundation::{ChannelName, EventName};

/// Opaque event payload.
///
/// Structured bodies are carried as parsed JSON; anything else travels as
/// raw text and is never validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Parses a structured body. Fails on malformed JSON.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body).map(Payload::Json)
    }

    /// Wraps an unstructured body as text (invalid UTF-8 is replaced).
    pub fn from_text_bytes(body: &[u8]) -> Self {
        Payload::Text(String::from_utf8_lossy(body).into_owned())
    }

    /// Short human-readable rendering for logs.
    pub fn preview(&self, max_chars: usize) -> String {
        let full = match self {
            Payload::Json(value) => value.to_string(),
            Payload::Text(text) => text.clone(),
        };
        if full.chars().count() <= max_chars {
            full
        } else {
            let mut cut: String = full.chars().take(max_chars).collect();
            cut.push('…');
            cut
        }
    }
}

/// Wire envelope `{channel, eventName, data}` delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub channel: ChannelName,
    pub event_name: EventName,
    pub data: Payload,
}

/// A single publish: immutable and transient.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEvent {
    channel: ChannelName,
    event_name: EventName,
    payload: Payload,
}

impl RelayEvent {
    pub fn new(channel: ChannelName, event_name: EventName, payload: Payload) -> Self {
        Self {
            channel,
            event_name,
            payload,
        }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn event_name(&self) -> &EventName {
        &self.event_name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Composite event name `channel:eventName` used for the typed per-channel event.
    pub fn composite_name(&self) -> String {
        format!("{}:{}", self.channel, self.event_name)
    }

    /// Consumes the event into its wire envelope.
    pub fn into_envelope(self) -> EventEnvelope {
        EventEnvelope {
            channel: self.channel,
            event_name: self.event_name,
            data: self.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders_created(payload: Payload) -> RelayEvent {
        RelayEvent::new(
            ChannelName::new("orders").unwrap(),
            EventName::new("created").unwrap(),
            payload,
        )
    }

    #[test]
    fn composite_name_joins_channel_and_event() {
        let event = orders_created(Payload::Text("x".into()));
        assert_eq!(event.composite_name(), "orders:created");
    }

    #[test]
    fn envelope_serializes_json_payload_inline() {
        let event = orders_created(Payload::Json(json!({"id": 42})));
        let value = serde_json::to_value(event.into_envelope()).unwrap();
        assert_eq!(
            value,
            json!({"channel": "orders", "eventName": "created", "data": {"id": 42}})
        );
    }

    #[test]
    fn envelope_serializes_text_payload_as_string() {
        let event = orders_created(Payload::Text("hello".into()));
        let value = serde_json::to_value(event.into_envelope()).unwrap();
        assert_eq!(value["data"], json!("hello"));
    }

    #[test]
    fn malformed_json_body_is_rejected() {
        assert!(Payload::from_json_bytes(b"{not json").is_err());
        assert_eq!(
            Payload::from_json_bytes(br#"{"id":42}"#).unwrap(),
            Payload::Json(json!({"id": 42}))
        );
    }

    #[test]
    fn text_body_is_never_validated() {
        assert_eq!(
            Payload::from_text_bytes(b"{not json"),
            Payload::Text("{not json".into())
        );
    }

    #[test]
    fn preview_truncates_long_payloads() {
        let payload = Payload::Text("abcdefghij".into());
        assert_eq!(payload.preview(4), "abcd…");
        assert_eq!(payload.preview(20), "abcdefghij");
    }
}
