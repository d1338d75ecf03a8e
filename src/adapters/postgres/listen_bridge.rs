//! PostgreSQL LISTEN/NOTIFY implementation of UpstreamBridge.
//!
//! Each opened channel gets its own [`PgListener`] connection; connections
//! are never pooled or shared between channels. A forwarding task hands
//! every notification payload to the [`NotificationHandler`] in the order
//! Postgres delivered it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use sqlx::postgres::PgListener;
use tokio::task::JoinHandle;

use crate::domain::foundation::ChannelName;
use crate::ports::{BridgeError, NotificationHandler, UpstreamBridge, UpstreamSubscription};

/// Pause before polling a listener again after a receive error.
const RECV_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Opens one `LISTEN` connection per relay channel.
pub struct PgListenBridge {
    url: Secret<String>,
    connect_timeout: Duration,
}

impl PgListenBridge {
    /// Creates a bridge for the given connection string.
    pub fn new(url: Secret<String>, connect_timeout: Duration) -> Self {
        Self {
            url,
            connect_timeout,
        }
    }

    async fn connect_and_listen(&self, channel: &ChannelName) -> Result<PgListener, BridgeError> {
        let mut listener = PgListener::connect(self.url.expose_secret())
            .await
            .map_err(|e| BridgeError::Connect(e.to_string()))?;

        listener
            .listen(channel.as_str())
            .await
            .map_err(|e| BridgeError::Listen {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        Ok(listener)
    }
}

impl std::fmt::Debug for PgListenBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgListenBridge")
            .field("url", &"[REDACTED]")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[async_trait]
impl UpstreamBridge for PgListenBridge {
    async fn open(
        &self,
        channel: &ChannelName,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<Box<dyn UpstreamSubscription>, BridgeError> {
        let listener = tokio::time::timeout(self.connect_timeout, self.connect_and_listen(channel))
            .await
            .map_err(|_| BridgeError::Timeout(self.connect_timeout))??;

        tracing::debug!(channel = %channel, "Listening on Postgres channel");

        let task = tokio::spawn(forward_notifications(listener, channel.clone(), handler));
        Ok(Box::new(PgListenSubscription::new(channel.clone(), task)))
    }
}

async fn forward_notifications(
    mut listener: PgListener,
    channel: ChannelName,
    handler: Arc<dyn NotificationHandler>,
) {
    loop {
        match listener.recv().await {
            Ok(notification) => {
                handler.on_notification(&channel, notification.payload()).await;
            }
            Err(e) => {
                tracing::warn!(
                    channel = %channel,
                    error = %e,
                    "Postgres listener receive failed, retrying"
                );
                tokio::time::sleep(RECV_RETRY_DELAY).await;
            }
        }
    }
}

/// Live `LISTEN` subscription. Closing stops the forwarding task, which
/// drops the listener and its database connection.
pub struct PgListenSubscription {
    channel: ChannelName,
    task: Option<JoinHandle<()>>,
}

impl PgListenSubscription {
    pub(crate) fn new(channel: ChannelName, task: JoinHandle<()>) -> Self {
        Self {
            channel,
            task: Some(task),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

#[async_trait]
impl UpstreamSubscription for PgListenSubscription {
    async fn close(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        // Abort rather than signal: the task may be waiting on the channel
        // lock the caller holds.
        task.abort();
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                tracing::warn!(channel = %self.channel, error = %e, "Listener task ended abnormally");
            }
        }
        tracing::debug!(channel = %self.channel, "Stopped listening on Postgres channel");
    }

    fn channel(&self) -> &ChannelName {
        &self.channel
    }
}

impl Drop for PgListenSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
