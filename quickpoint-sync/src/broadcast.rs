//! In-process broadcast medium shared by viewer instances.
//!
//! Stands in for a same-origin `BroadcastChannel`: many writers, many
//! readers, no locking on the send path, no acknowledgment. Each
//! subscriber gets an independent receiver buffering up to `capacity`
//! messages; a subscriber that falls further behind loses the oldest
//! messages (best-effort delivery). Per-sender order is preserved.
//!
//! Like `BroadcastChannel`, a sender does not hear its own posts; the
//! envelope carries the sender id so receivers can skip them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::protocol::{InstanceInfo, ProtocolError, SyncMessage};

/// One posted message as seen by every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sender: Uuid,
    /// JSON-encoded [`SyncMessage`] (or anything a newer viewer sends).
    pub payload: String,
}

/// Receiving end handed to each joined instance.
pub type BusReceiver = broadcast::Receiver<Arc<Envelope>>;

/// Statistics for monitoring channel health.
#[derive(Debug, Clone, Default)]
pub struct BroadcastStats {
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub active_instances: usize,
}

/// Atomic broadcast stats, lock-free on the hot path.
struct AtomicBroadcastStats {
    messages_sent: AtomicU64,
    messages_dropped: AtomicU64,
}

impl AtomicBroadcastStats {
    fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }
}

/// A broadcast group for a single named channel.
pub struct BroadcastGroup {
    /// Broadcast channel sender (cloned per-channel)
    sender: broadcast::Sender<Arc<Envelope>>,

    /// Joined viewer instances
    instances: Arc<RwLock<HashMap<Uuid, InstanceInfo>>>,

    /// Channel capacity (messages buffered per receiver)
    capacity: usize,

    atomic_stats: Arc<AtomicBroadcastStats>,
}

impl BroadcastGroup {
    /// Create a new broadcast group with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            instances: Arc::new(RwLock::new(HashMap::new())),
            capacity,
            atomic_stats: Arc::new(AtomicBroadcastStats::new()),
        }
    }

    /// Add an instance to this group and return its receiver.
    pub async fn join(&self, info: InstanceInfo) -> BusReceiver {
        let mut instances = self.instances.write().await;
        log::debug!("broadcast: {} ({:?}) joined", info.label, info.role);
        instances.insert(info.instance_id, info);
        self.sender.subscribe()
    }

    /// Remove an instance from this group.
    pub async fn leave(&self, instance_id: &Uuid) -> Option<InstanceInfo> {
        let mut instances = self.instances.write().await;
        instances.remove(instance_id)
    }

    /// Post a message from `sender` to every subscriber.
    ///
    /// Returns the number of receivers the message was queued for
    /// (including the sender's own receiver, which skips it on read).
    pub fn post(&self, sender: Uuid, msg: &SyncMessage) -> Result<usize, ProtocolError> {
        let payload = msg.encode()?;
        Ok(self.post_raw(Arc::new(Envelope { sender, payload })))
    }

    /// Post a pre-built envelope directly.
    pub fn post_raw(&self, envelope: Arc<Envelope>) -> usize {
        let count = self.sender.send(envelope).unwrap_or(0);
        self.atomic_stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Record messages a lagging receiver lost.
    pub fn record_dropped(&self, count: u64) {
        self.atomic_stats.messages_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Get broadcast statistics (lock-free snapshot of counters).
    pub async fn stats(&self) -> BroadcastStats {
        let instances = self.instances.read().await;
        BroadcastStats {
            messages_sent: self.atomic_stats.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.atomic_stats.messages_dropped.load(Ordering::Relaxed),
            active_instances: instances.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe without registering an instance (observers, tests).
    pub fn subscribe(&self) -> BusReceiver {
        self.sender.subscribe()
    }
}

/// Maps channel names to broadcast groups, like an origin's set of
/// `BroadcastChannel` names.
pub struct ChannelRegistry {
    channels: Arc<RwLock<HashMap<String, Arc<BroadcastGroup>>>>,
    default_capacity: usize,
}

impl ChannelRegistry {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            default_capacity,
        }
    }

    /// Get or create the group for a channel name.
    pub async fn get_or_create(&self, name: &str) -> Arc<BroadcastGroup> {
        // Fast path: read lock
        {
            let channels = self.channels.read().await;
            if let Some(group) = channels.get(name) {
                return group.clone();
            }
        }

        let mut channels = self.channels.write().await;
        // Double-check after acquiring write lock
        if let Some(group) = channels.get(name) {
            return group.clone();
        }

        let group = Arc::new(BroadcastGroup::new(self.default_capacity));
        channels.insert(name.to_string(), group.clone());
        group
    }

    /// Remove a channel nobody has joined.
    pub async fn remove_if_empty(&self, name: &str) -> bool {
        let mut channels = self.channels.write().await;
        if let Some(group) = channels.get(name) {
            if group.instance_count().await == 0 {
                channels.remove(name);
                return true;
            }
        }
        false
    }
}
