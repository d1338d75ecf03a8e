//! Channel subscription manager: reference-counted upstream lifecycle.
//!
//! Every mutation of one channel's `{members, state, upstream}` happens
//! while holding that channel's record lock, so the 0 → 1 activation and
//! the 1 → 0 teardown are single steps relative to each other. Opening and
//! closing the upstream subscription also happen under the lock: a
//! subscriber arriving during either waits for it to finish and then sees
//! a consistent record.
//!
//! Channels are independent. No lock spans two channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::foundation::{ChannelName, ConnectionId};
use crate::domain::relay::{JoinOutcome, LeaveOutcome};
use crate::ports::{NotificationHandler, UpstreamBridge};

use super::registry::{Channel, ChannelEntry, ConnectionRegistry};
use super::RelayError;

/// Owns the per-channel subscription lifecycle.
pub struct SubscriptionManager {
    registry: Arc<ConnectionRegistry>,
    bridge: Option<Arc<dyn UpstreamBridge>>,
    notifications: Arc<dyn NotificationHandler>,
    shutting_down: AtomicBool,
}

impl SubscriptionManager {
    /// Create a manager. `bridge` is `None` when no upstream source is
    /// configured; subscriptions are then purely local.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        bridge: Option<Arc<dyn UpstreamBridge>>,
        notifications: Arc<dyn NotificationHandler>,
    ) -> Self {
        Self {
            registry,
            bridge,
            notifications,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn bridging_enabled(&self) -> bool {
        self.bridge.is_some()
    }

    /// Join `connection` to `channel`, activating the channel if needed.
    ///
    /// Joining twice is the same as joining once. If the upstream open
    /// fails the local membership stands, the channel stays Inactive, and
    /// the next `subscribe` for the channel retries the open.
    pub async fn subscribe(
        &self,
        connection: &ConnectionId,
        channel: &ChannelName,
    ) -> Result<JoinOutcome, RelayError> {
        loop {
            if self.is_shutting_down() {
                return Err(RelayError::ShuttingDown);
            }

            let entry = self.registry.channel_or_insert(channel).await;
            let mut record = entry.lock().await;
            if entry.is_retired() {
                continue;
            }
            if self.is_shutting_down() {
                return Err(RelayError::ShuttingDown);
            }

            let outcome = match self.registry.join(&mut record, connection, channel).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if record.is_empty() {
                        entry.retire();
                        drop(record);
                        self.registry.remove_retired(channel, &entry).await;
                    }
                    return Err(e);
                }
            };

            if record.needs_activation() {
                self.activate(channel, &mut record).await;
            }

            tracing::debug!(
                connection_id = %connection,
                channel = %channel,
                members = record.member_count(),
                "Connection subscribed"
            );
            return Ok(outcome);
        }
    }

    /// Remove `connection` from `channel`. On the last leave the upstream
    /// subscription is released and the channel record discarded.
    pub async fn unsubscribe(&self, connection: &ConnectionId, channel: &ChannelName) -> LeaveOutcome {
        loop {
            let Some(entry) = self.registry.channel(channel).await else {
                return LeaveOutcome::NotMember;
            };
            let mut record = entry.lock().await;
            if entry.is_retired() {
                // A retired entry may have been left in the map by a cancelled
                // teardown. Remove it (a no-op if already replaced) and retry.
                drop(record);
                self.registry.remove_retired(channel, &entry).await;
                continue;
            }

            let outcome = self.registry.leave(&mut record, connection, channel).await;
            if outcome == LeaveOutcome::Emptied {
                self.teardown(channel, &entry, record).await;
            } else {
                tracing::debug!(
                    connection_id = %connection,
                    channel = %channel,
                    members = record.member_count(),
                    "Connection unsubscribed"
                );
            }
            return outcome;
        }
    }

    /// Unregister `connection` and leave every channel it belonged to.
    ///
    /// Each channel is left exactly once, in name order, and its teardown
    /// check runs against the record state at that moment.
    pub async fn disconnect(&self, connection: &ConnectionId) {
        let channels = self.registry.unregister(connection).await;
        tracing::debug!(
            connection_id = %connection,
            channels = channels.len(),
            "Connection disconnected"
        );
        for channel in &channels {
            self.unsubscribe(connection, channel).await;
        }
    }

    /// Close every active upstream subscription and refuse new subscribers.
    ///
    /// Local memberships are dropped along with the channel records.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut closed = 0usize;
        for (channel, entry) in self.registry.drain_channels().await {
            let mut record = entry.lock().await;
            entry.retire();
            if let Some(mut upstream) = record.release_upstream() {
                upstream.close().await;
                closed += 1;
                tracing::info!(channel = %channel, "Closed upstream subscription on shutdown");
            }
        }
        tracing::info!(closed, "Subscription manager shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Channels with at least one member, in name order.
    pub async fn active_channels(&self) -> Vec<ChannelName> {
        let mut active = Vec::new();
        for (name, entry) in self.registry.channel_entries().await {
            if !entry.lock().await.is_empty() {
                active.push(name);
            }
        }
        active
    }

    /// True when `channel` currently holds an upstream subscription.
    pub async fn is_bridged(&self, channel: &ChannelName) -> bool {
        let Some(entry) = self.registry.channel(channel).await else {
            return false;
        };
        let record = entry.lock().await;
        record.has_upstream()
    }

    async fn activate(&self, channel: &ChannelName, record: &mut Channel) {
        let Some(bridge) = &self.bridge else {
            record.activate(None);
            return;
        };

        match bridge.open(channel, self.notifications.clone()).await {
            Ok(upstream) => {
                if let Some(mut refused) = record.activate(Some(upstream)) {
                    refused.close().await;
                }
                tracing::info!(channel = %channel, "Opened upstream subscription");
            }
            Err(e) => {
                tracing::warn!(
                    channel = %channel,
                    error = %e,
                    "Failed to open upstream subscription; channel stays inactive until next subscribe"
                );
            }
        }
    }

    async fn teardown(
        &self,
        channel: &ChannelName,
        entry: &Arc<ChannelEntry>,
        mut record: tokio::sync::MutexGuard<'_, Channel>,
    ) {
        if let Some(mut upstream) = record.deactivate() {
            upstream.close().await;
            tracing::info!(channel = %channel, "Closed upstream subscription");
        }
        if record.is_empty() {
            entry.retire();
            drop(record);
            self.registry.remove_retired(channel, entry).await;
            tracing::debug!(channel = %channel, "Channel emptied");
        }
    }
}
