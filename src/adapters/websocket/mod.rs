//! WebSocket adapter: the client-facing side of the relay.
//!
//! # Architecture
//!
//! ```text
//!   client ──frames──▶ handler ──subscribe/unsubscribe──▶ SubscriptionManager
//!     ▲                                                          │
//!     │                                                 ConnectionRegistry
//!     │                                                          │
//!     └──────────── send task ◀──── outbox (Delivery) ◀──────────┘
//! ```
//!
//! - [`messages`] - frame protocol types
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod messages;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{
    ChannelMessage, ClientMessage, ConnectedMessage, ErrorMessage, ServerData, ServerMessage,
};
