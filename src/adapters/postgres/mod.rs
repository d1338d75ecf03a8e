//! PostgreSQL adapters.
//!
//! - `PgListenBridge` - LISTEN/NOTIFY upstream bridge, one connection per channel

mod listen_bridge;

pub use listen_bridge::{PgListenBridge, PgListenSubscription};
