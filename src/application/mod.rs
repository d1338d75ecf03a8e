//! Application layer - the relay core.
//!
//! Coordinates domain records and ports:
//!
//! - [`ConnectionRegistry`] - live connections and channel membership
//! - [`SubscriptionManager`] - reference-counted upstream subscription lifecycle
//! - [`EventBroadcaster`] - fan-out of published and bridged events

mod broadcaster;
mod error;
mod registry;
mod subscriptions;

pub use broadcaster::{EventBroadcaster, PublishReport, WILDCARD_EVENT};
pub use error::RelayError;
pub use registry::{
    Channel, ChannelEntry, ConnectionRegistry, Delivery, UpstreamHandle, DEFAULT_OUTBOX_CAPACITY,
};
pub use subscriptions::SubscriptionManager;
