//! Adapters - Implementations of port interfaces and the network surface.
//!
//! - `postgres` - LISTEN/NOTIFY upstream bridge
//! - `websocket` - real-time client connections
//! - `http` - publish endpoint, status page and router assembly

pub mod http;
pub mod postgres;
pub mod websocket;

pub use http::{create_router, local_hostname, AppState};
pub use postgres::PgListenBridge;
