//! UpstreamBridge port - Interface for external notification sources.
//!
//! An upstream bridge mirrors an external notification channel (e.g. a
//! Postgres `LISTEN` channel) into the relay. Each active relay channel owns
//! exactly one [`UpstreamSubscription`]; it is never shared or pooled.
//!
//! ## Lifecycle
//!
//! 1. First local subscriber joins channel `orders`
//! 2. Core calls `bridge.open("orders", handler)`
//! 3. The bridge delivers every raw payload to `handler` in receipt order
//! 4. Last local subscriber leaves
//! 5. Core calls `subscription.close()` exactly once

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::ChannelName;

/// Errors that can occur while opening an upstream subscription.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The external source could not be reached.
    #[error("Upstream connection failed: {0}")]
    Connect(String),

    /// Connected, but the listen request was refused.
    #[error("Upstream listen on '{channel}' failed: {reason}")]
    Listen { channel: String, reason: String },

    /// Opening did not complete in time.
    #[error("Upstream open timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Callback receiving raw notifications from an upstream subscription.
///
/// Implementations must not fail: malformed payloads are logged and dropped
/// so a bad notification never tears down the subscription.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handle one notification payload for `channel`.
    async fn on_notification(&self, channel: &ChannelName, payload: &str);
}

/// Live handle for one channel's upstream subscription.
#[async_trait]
pub trait UpstreamSubscription: Send + Sync {
    /// Terminates the external connection and releases handle state.
    ///
    /// Idempotent: closing twice, or closing an already-dead subscription,
    /// is a no-op.
    async fn close(&mut self);

    /// The channel this subscription listens on.
    fn channel(&self) -> &ChannelName;
}

/// Port for opening upstream subscriptions.
///
/// # Example
///
/// ```ignore
/// let subscription = bridge.open(&channel, broadcaster.clone()).await?;
/// // ... later, when the channel empties:
/// let mut subscription = subscription;
/// subscription.close().await;
/// ```
#[async_trait]
pub trait UpstreamBridge: Send + Sync {
    /// Establish one dedicated subscription for `channel`.
    async fn open(
        &self,
        channel: &ChannelName,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<Box<dyn UpstreamSubscription>, BridgeError>;
}
