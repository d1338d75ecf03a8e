//! Notify Relay - real-time event relay
//!
//! Clients hold WebSocket connections and subscribe to named channels.
//! Events reach them from two sources: HTTP publishes (`POST /pub/...`) and,
//! when an upstream database is configured, Postgres `NOTIFY` on a channel
//! of the same name.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
