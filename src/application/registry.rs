//! Connection registry: live connections and channel membership.
//!
//! Membership is recorded on both sides. Each channel owns its member set
//! inside a [`ChannelRecord`] guarded by a per-channel lock; each
//! connection keeps a non-owning list of channel names so a disconnect can
//! enumerate exactly the channels it must leave.
//!
//! ```text
//! connections                         channels
//! ├── conn-a → {orders, users}        ├── orders → Mutex<{a, b}, upstream>
//! ├── conn-b → {orders}               └── users  → Mutex<{a}, upstream>
//! └── conn-c → {}
//! ```
//!
//! # Lock ordering
//!
//! A channel record lock may be held while taking the `connections` lock,
//! never the reverse. The `channels` map lock is never held while waiting on
//! a record lock.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex, MutexGuard, RwLock};

use crate::domain::foundation::{ChannelName, ConnectionId};
use crate::domain::relay::{ChannelRecord, EventEnvelope, JoinOutcome, LeaveOutcome};
use crate::ports::UpstreamSubscription;

use super::RelayError;

/// Owned upstream handle stored in a channel record.
pub type UpstreamHandle = Box<dyn UpstreamSubscription>;

/// Channel record as held by the registry.
pub type Channel = ChannelRecord<UpstreamHandle>;

/// Default per-connection outbox depth.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 128;

/// A message queued for one connection.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// A published event, named either `channel:eventName` or `all`.
    Event {
        name: Arc<str>,
        envelope: Arc<EventEnvelope>,
    },
    /// A bridged upstream notification.
    Notification {
        channel: ChannelName,
        data: Arc<Value>,
    },
}

/// One channel's lock-protected record plus its retirement flag.
///
/// An entry is retired once its last member left and it is being removed
/// from the map. Anyone who locks a retired entry must look the channel up
/// again instead of using it.
pub struct ChannelEntry {
    record: Mutex<Channel>,
    retired: AtomicBool,
}

impl ChannelEntry {
    fn new() -> Self {
        Self {
            record: Mutex::new(ChannelRecord::new()),
            retired: AtomicBool::new(false),
        }
    }

    /// Locks the channel record.
    pub async fn lock(&self) -> MutexGuard<'_, Channel> {
        self.record.lock().await
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Marks the entry retired. Call while holding the record lock.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

struct ConnectionEntry {
    outbox: mpsc::Sender<Delivery>,
    channels: BTreeSet<ChannelName>,
}

/// Tracks live connections and which channels they belong to.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    channels: RwLock<HashMap<ChannelName, Arc<ChannelEntry>>>,
    outbox_capacity: usize,
}

impl ConnectionRegistry {
    /// Create a registry whose connections queue up to `outbox_capacity`
    /// undelivered messages each.
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }

    // ───────────────────────────────────────────────────────────────
    // Connections
    // ───────────────────────────────────────────────────────────────

    /// Register a new connection and return the receiving end of its outbox.
    ///
    /// Re-registering an existing id replaces its outbox but keeps its
    /// channel list.
    pub async fn register(&self, connection: ConnectionId) -> mpsc::Receiver<Delivery> {
        let (tx, rx) = mpsc::channel(self.outbox_capacity);
        let mut connections = self.connections.write().await;
        connections
            .entry(connection)
            .and_modify(|entry| entry.outbox = tx.clone())
            .or_insert_with(|| ConnectionEntry {
                outbox: tx,
                channels: BTreeSet::new(),
            });
        rx
    }

    /// Remove a connection, returning every channel it belonged to in a
    /// stable order.
    ///
    /// The caller must leave each returned channel so its reference count
    /// is decremented; [`SubscriptionManager::disconnect`] does this.
    ///
    /// [`SubscriptionManager::disconnect`]: super::SubscriptionManager::disconnect
    pub async fn unregister(&self, connection: &ConnectionId) -> Vec<ChannelName> {
        self.connections
            .write()
            .await
            .remove(connection)
            .map(|entry| entry.channels.into_iter().collect())
            .unwrap_or_default()
    }

    pub async fn is_registered(&self, connection: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(connection)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Channels the connection currently belongs to.
    pub async fn channels_of(&self, connection: &ConnectionId) -> BTreeSet<ChannelName> {
        self.connections
            .read()
            .await
            .get(connection)
            .map(|entry| entry.channels.clone())
            .unwrap_or_default()
    }

    // ───────────────────────────────────────────────────────────────
    // Membership (callers hold the channel record lock)
    // ───────────────────────────────────────────────────────────────

    /// Add `connection` to the locked channel record. Idempotent.
    pub async fn join(
        &self,
        record: &mut Channel,
        connection: &ConnectionId,
        channel: &ChannelName,
    ) -> Result<JoinOutcome, RelayError> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(connection)
            .ok_or(RelayError::NotConnected(*connection))?;
        entry.channels.insert(channel.clone());
        Ok(record.join(*connection))
    }

    /// Remove `connection` from the locked channel record. A no-op for
    /// non-members.
    pub async fn leave(
        &self,
        record: &mut Channel,
        connection: &ConnectionId,
        channel: &ChannelName,
    ) -> LeaveOutcome {
        if let Some(entry) = self.connections.write().await.get_mut(connection) {
            entry.channels.remove(channel);
        }
        record.leave(connection)
    }

    /// Current members of `channel`.
    pub async fn members_of(&self, channel: &ChannelName) -> BTreeSet<ConnectionId> {
        let Some(entry) = self.channel(channel).await else {
            return BTreeSet::new();
        };
        let record = entry.lock().await;
        record.members().copied().collect()
    }

    // ───────────────────────────────────────────────────────────────
    // Channel entries
    // ───────────────────────────────────────────────────────────────

    /// Look up a channel entry without creating it.
    pub async fn channel(&self, channel: &ChannelName) -> Option<Arc<ChannelEntry>> {
        self.channels.read().await.get(channel).cloned()
    }

    /// Look up a channel entry, creating it (or replacing a retired one).
    pub async fn channel_or_insert(&self, channel: &ChannelName) -> Arc<ChannelEntry> {
        let mut channels = self.channels.write().await;
        match channels.get(channel) {
            Some(entry) if !entry.is_retired() => entry.clone(),
            _ => {
                let entry = Arc::new(ChannelEntry::new());
                channels.insert(channel.clone(), entry.clone());
                entry
            }
        }
    }

    /// Drop a retired entry from the map unless it was already replaced.
    pub async fn remove_retired(&self, channel: &ChannelName, entry: &Arc<ChannelEntry>) {
        let mut channels = self.channels.write().await;
        if channels
            .get(channel)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            channels.remove(channel);
        }
    }

    /// Remove and return every channel entry (process shutdown).
    pub async fn drain_channels(&self) -> Vec<(ChannelName, Arc<ChannelEntry>)> {
        let mut channels = self.channels.write().await;
        let mut drained: Vec<_> = channels.drain().collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    /// Snapshot of all channel entries in name order.
    pub async fn channel_entries(&self) -> Vec<(ChannelName, Arc<ChannelEntry>)> {
        let mut entries: Vec<_> = self
            .channels
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    // ───────────────────────────────────────────────────────────────
    // Delivery
    // ───────────────────────────────────────────────────────────────

    /// Queue `delivery` for each target connection. Returns how many
    /// outboxes accepted it.
    ///
    /// Delivery is at-most-once: a full outbox drops the message for that
    /// connection only.
    pub async fn deliver<'a, I>(&self, targets: I, delivery: &Delivery) -> usize
    where
        I: IntoIterator<Item = &'a ConnectionId>,
    {
        let connections = self.connections.read().await;
        targets
            .into_iter()
            .filter_map(|id| connections.get(id).map(|entry| (id, entry)))
            .filter(|(id, entry)| try_enqueue(id, &entry.outbox, delivery.clone()))
            .count()
    }

    /// Queue `delivery` for every registered connection (wildcard room).
    pub async fn deliver_all(&self, delivery: &Delivery) -> usize {
        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(id, entry)| try_enqueue(id, &entry.outbox, delivery.clone()))
            .count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn try_enqueue(id: &ConnectionId, outbox: &mpsc::Sender<Delivery>, delivery: Delivery) -> bool {
    match outbox.try_send(delivery) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!(connection_id = %id, "Outbox full, dropping message for slow consumer");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::EventName;
    use crate::domain::relay::Payload;

    fn channel(name: &str) -> ChannelName {
        ChannelName::new(name).unwrap()
    }

    fn event_delivery() -> Delivery {
        Delivery::Event {
            name: Arc::from("orders:created"),
            envelope: Arc::new(EventEnvelope {
                channel: channel("orders"),
                event_name: EventName::new("created").unwrap(),
                data: Payload::Text("x".into()),
            }),
        }
    }

    async fn join(registry: &ConnectionRegistry, conn: &ConnectionId, name: &str) -> JoinOutcome {
        let name = channel(name);
        let entry = registry.channel_or_insert(&name).await;
        let mut record = entry.lock().await;
        registry.join(&mut record, conn, &name).await.unwrap()
    }

    async fn leave(registry: &ConnectionRegistry, conn: &ConnectionId, name: &str) -> LeaveOutcome {
        let name = channel(name);
        let entry = registry.channel_or_insert(&name).await;
        let mut record = entry.lock().await;
        registry.leave(&mut record, conn, &name).await
    }

    #[tokio::test]
    async fn register_tracks_connection() {
        let registry = ConnectionRegistry::default();
        let conn = ConnectionId::new();
        let _rx = registry.register(conn).await;

        assert!(registry.is_registered(&conn).await);
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn join_records_both_sides() {
        let registry = ConnectionRegistry::default();
        let conn = ConnectionId::new();
        let _rx = registry.register(conn).await;

        assert_eq!(join(&registry, &conn, "orders").await, JoinOutcome::Joined { first: true });

        assert!(registry.members_of(&channel("orders")).await.contains(&conn));
        assert!(registry.channels_of(&conn).await.contains(&channel("orders")));
    }

    #[tokio::test]
    async fn join_twice_is_single_membership() {
        let registry = ConnectionRegistry::default();
        let conn = ConnectionId::new();
        let _rx = registry.register(conn).await;

        join(&registry, &conn, "orders").await;
        assert_eq!(join(&registry, &conn, "orders").await, JoinOutcome::AlreadyMember);
        assert_eq!(registry.members_of(&channel("orders")).await.len(), 1);
    }

    #[tokio::test]
    async fn join_unknown_connection_fails() {
        let registry = ConnectionRegistry::default();
        let name = channel("orders");
        let entry = registry.channel_or_insert(&name).await;
        let mut record = entry.lock().await;

        let result = registry.join(&mut record, &ConnectionId::new(), &name).await;
        assert!(matches!(result, Err(RelayError::NotConnected(_))));
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn leave_non_member_is_noop() {
        let registry = ConnectionRegistry::default();
        let conn = ConnectionId::new();
        let _rx = registry.register(conn).await;

        assert_eq!(leave(&registry, &conn, "orders").await, LeaveOutcome::NotMember);
    }

    #[tokio::test]
    async fn unregister_returns_channels_in_order() {
        let registry = ConnectionRegistry::default();
        let conn = ConnectionId::new();
        let _rx = registry.register(conn).await;
        join(&registry, &conn, "users").await;
        join(&registry, &conn, "orders").await;

        let channels = registry.unregister(&conn).await;
        assert_eq!(channels, vec![channel("orders"), channel("users")]);
        assert!(!registry.is_registered(&conn).await);
        assert!(registry.unregister(&conn).await.is_empty());
    }

    #[tokio::test]
    async fn retired_entry_is_replaced_on_lookup() {
        let registry = ConnectionRegistry::default();
        let name = channel("orders");
        let first = registry.channel_or_insert(&name).await;
        first.retire();

        let second = registry.channel_or_insert(&name).await;
        assert!(!Arc::ptr_eq(&first, &second));

        // Removing the stale entry must not drop its replacement.
        registry.remove_retired(&name, &first).await;
        assert!(registry.channel(&name).await.is_some());
    }

    #[tokio::test]
    async fn deliver_reaches_only_targets() {
        let registry = ConnectionRegistry::default();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = registry.register(a).await;
        let mut rx_b = registry.register(b).await;

        let delivered = registry.deliver([&a], &event_delivery()).await;
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn deliver_all_reaches_everyone() {
        let registry = ConnectionRegistry::default();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            receivers.push(registry.register(ConnectionId::new()).await);
        }

        assert_eq!(registry.deliver_all(&event_delivery()).await, 3);
        for rx in receivers.iter_mut() {
            assert!(rx.try_recv().is_ok());
        }
    }

    #[tokio::test]
    async fn full_outbox_drops_message() {
        let registry = ConnectionRegistry::new(1);
        let conn = ConnectionId::new();
        let mut rx = registry.register(conn).await;

        assert_eq!(registry.deliver([&conn], &event_delivery()).await, 1);
        assert_eq!(registry.deliver([&conn], &event_delivery()).await, 0);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
