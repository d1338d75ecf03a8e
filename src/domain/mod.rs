//! Domain layer containing the relay's pure types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, names, timestamps, errors)
//! - `relay` - Event model and per-channel membership state machine

pub mod foundation;
pub mod relay;
