//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, names, timestamps and error types that form the
//! vocabulary of the relay domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{ErrorCode, ValidationError};
pub use ids::{ChannelName, ConnectionId, EventName, MAX_CHANNEL_NAME_LEN};
pub use timestamp::Timestamp;
