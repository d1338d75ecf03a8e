//! Event fan-out to channel rooms and the wildcard room.
//!
//! # Event Flow
//!
//! ```text
//! POST /pub/orders/created          upstream NOTIFY orders
//!          │                                 │
//!          ▼                                 ▼
//! ┌──────────────────┐            ┌─────────────────────┐
//! │ publish()        │            │ on_notification()   │
//! │ orders:created → │            │ parse JSON payload  │
//! │   members(orders)│            │ notification →      │
//! │ all → everyone   │            │   members(orders)   │
//! └──────────────────┘            └─────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{ChannelName, EventName};
use crate::domain::relay::{Payload, RelayEvent};
use crate::ports::NotificationHandler;

use super::registry::{ConnectionRegistry, Delivery};

/// Name of the wildcard event every connection receives.
pub const WILDCARD_EVENT: &str = "all";

/// How many connections one publish reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Members of the channel room that received the typed event.
    pub channel_deliveries: usize,
    /// Connections that received the wildcard `all` event.
    pub wildcard_deliveries: usize,
}

/// Broadcasts events to the connections in the [`ConnectionRegistry`].
pub struct EventBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn new_shared(registry: Arc<ConnectionRegistry>) -> Arc<Self> {
        Arc::new(Self::new(registry))
    }

    /// Publish `payload` as `channel:event_name` to the channel's members
    /// and as `all` to every connection.
    ///
    /// At-most-once per currently connected recipient; nothing is buffered
    /// for connections that join later.
    pub async fn publish(
        &self,
        channel: ChannelName,
        event_name: EventName,
        payload: Payload,
    ) -> PublishReport {
        let event = RelayEvent::new(channel, event_name, payload);
        let composite: Arc<str> = Arc::from(event.composite_name());

        tracing::debug!(
            event = %composite,
            data = %event.payload().preview(120),
            "Publishing event"
        );

        let channel = event.channel().clone();
        let envelope = Arc::new(event.into_envelope());

        let members = self.registry.members_of(&channel).await;
        let channel_deliveries = self
            .registry
            .deliver(
                members.iter(),
                &Delivery::Event {
                    name: composite,
                    envelope: envelope.clone(),
                },
            )
            .await;

        let wildcard_deliveries = self
            .registry
            .deliver_all(&Delivery::Event {
                name: Arc::from(WILDCARD_EVENT),
                envelope,
            })
            .await;

        PublishReport {
            channel_deliveries,
            wildcard_deliveries,
        }
    }

    /// Deliver an upstream notification to the channel's members only.
    ///
    /// Returns the number of recipients, or `None` if the payload was not
    /// valid JSON and was dropped.
    pub async fn deliver_notification(&self, channel: &ChannelName, payload: &str) -> Option<usize> {
        let data = match serde_json::from_str(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    channel = %channel,
                    payload = %payload,
                    error = %e,
                    "Dropping upstream notification with malformed JSON payload"
                );
                return None;
            }
        };

        let members = self.registry.members_of(channel).await;
        let delivered = self
            .registry
            .deliver(
                members.iter(),
                &Delivery::Notification {
                    channel: channel.clone(),
                    data: Arc::new(data),
                },
            )
            .await;

        tracing::trace!(channel = %channel, delivered, "Forwarded upstream notification");
        Some(delivered)
    }
}

#[async_trait]
impl NotificationHandler for EventBroadcaster {
    async fn on_notification(&self, channel: &ChannelName, payload: &str) {
        self.deliver_notification(channel, payload).await;
    }
}
