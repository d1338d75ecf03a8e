//! Relay domain module.
//!
//! Pure types for the event fan-out core: the immutable event model and
//! the per-channel membership record with its activation state machine.
//! Nothing here performs I/O; the application layer owns locking and
//! upstream side effects.

mod channel;
mod event;

pub use channel::{ChannelRecord, ChannelState, JoinOutcome, LeaveOutcome};
pub use event::{EventEnvelope, Payload, RelayEvent};
