//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the outside world. Adapters implement these ports.
//!
//! - `UpstreamBridge` - Opens one subscription per channel on an external source
//! - `UpstreamSubscription` - Live, idempotently closable upstream handle
//! - `NotificationHandler` - Receives raw upstream payloads

mod upstream_bridge;

pub use upstream_bridge::{BridgeError, NotificationHandler, UpstreamBridge, UpstreamSubscription};
