//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Maximum channel name length in bytes.
///
/// Matches the Postgres identifier limit (NAMEDATALEN - 1) so that every
/// channel can be bridged with `LISTEN`.
pub const MAX_CHANNEL_NAME_LEN: usize = 63;

/// Unique identifier for a live real-time connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random ConnectionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ConnectionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Name of a channel (room) that connections subscribe to.
///
/// Non-empty, at most [`MAX_CHANNEL_NAME_LEN`] bytes, and free of NUL and
/// `:` (the separator in `channel:eventName` composite event names).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Creates a validated channel name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::empty_field("channel"));
        }
        if name.len() > MAX_CHANNEL_NAME_LEN {
            return Err(ValidationError::invalid_format(
                "channel",
                format!("longer than {} bytes", MAX_CHANNEL_NAME_LEN),
            ));
        }
        if name.contains('\0') || name.contains(':') {
            return Err(ValidationError::invalid_format(
                "channel",
                "must not contain ':' or NUL",
            ));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChannelName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ChannelName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Name of a published event within a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    /// Creates a validated event name (non-empty, no whitespace).
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::empty_field("event_name"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ValidationError::invalid_format(
                "event_name",
                "must not contain whitespace",
            ));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EventName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn connection_id_display_is_uuid() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string().len(), 36);
        let parsed: ConnectionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn channel_name_accepts_plain_names() {
        let name = ChannelName::new("orders").unwrap();
        assert_eq!(name.as_str(), "orders");
        assert_eq!(name.to_string(), "orders");
    }

    #[test]
    fn channel_name_rejects_empty() {
        assert!(matches!(
            ChannelName::new(""),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn channel_name_rejects_separator_and_nul() {
        assert!(ChannelName::new("orders:created").is_err());
        assert!(ChannelName::new("ord\0ers").is_err());
    }

    #[test]
    fn channel_name_rejects_overlong() {
        let long = "x".repeat(MAX_CHANNEL_NAME_LEN + 1);
        assert!(ChannelName::new(long).is_err());
        assert!(ChannelName::new("x".repeat(MAX_CHANNEL_NAME_LEN)).is_ok());
    }

    #[test]
    fn channel_name_deserialize_validates() {
        let ok: ChannelName = serde_json::from_str(r#""orders""#).unwrap();
        assert_eq!(ok.as_str(), "orders");
        assert!(serde_json::from_str::<ChannelName>(r#""""#).is_err());
    }

    #[test]
    fn event_name_rejects_whitespace() {
        assert!(EventName::new("created").is_ok());
        assert!(EventName::new("order created").is_err());
        assert!(EventName::new("").is_err());
    }
}
