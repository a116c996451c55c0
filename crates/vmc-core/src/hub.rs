//! Fan-out of machine notifications to push-channel subscribers.
//!
//! Each subscriber owns a bounded queue. [`NotificationHub::broadcast`]
//! walks the subscriber map and uses non-blocking sends, so a slow or
//! dead connection can never stall the state machine:
//!
//! - a full queue drops the frame for that subscriber only;
//! - a closed queue (the connection task has gone away) is pruned.
//!
//! [`NotificationHub::close`] detaches everyone and refuses later
//! attachments, which is how shutdown ends every push stream.
//!
//! There is no history. A subscriber sees the snapshot handed to
//! [`attach`](NotificationHub::attach) and then every frame broadcast
//! while it is attached.

use std::collections::HashMap;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use vmc_types::{Notification, SubscriberId};

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Receiving end of one attached subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Notification>,
}

impl Subscription {
    /// Identifier under which the subscriber is registered.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next frame.
    ///
    /// Returns `None` once the subscriber has been detached and its
    /// queue drained.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Take a queued frame without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

/// Attached subscribers plus the closed flag, guarded together so no
/// subscriber can register after [`NotificationHub::close`].
#[derive(Debug, Default)]
struct Registry {
    senders: HashMap<SubscriberId, mpsc::Sender<Notification>>,
    closed: bool,
}

/// The set of attached subscribers.
#[derive(Debug)]
pub struct NotificationHub {
    registry: Mutex<Registry>,
    buffer: usize,
}

impl NotificationHub {
    /// Create an empty hub whose subscribers queue up to `buffer` frames.
    ///
    /// A `buffer` of zero is raised to one.
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber with `snapshot` as its first frame.
    ///
    /// Once the hub is closed the subscriber is not registered: its
    /// stream yields the snapshot and then ends.
    pub async fn attach(&self, snapshot: Notification) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriberId::new();

        // A fresh queue has room for at least one frame.
        if tx.try_send(snapshot).is_err() {
            warn!(subscriber = %id, "failed to queue attach snapshot");
        }

        let mut registry = self.registry.lock().await;
        if registry.closed {
            debug!(subscriber = %id, "hub closed, subscriber not registered");
        } else {
            registry.senders.insert(id, tx);
            debug!(subscriber = %id, active = registry.senders.len(), "subscriber attached");
        }

        Subscription { id, rx }
    }

    /// Remove a subscriber. Returns `false` if it was not attached.
    pub async fn detach(&self, id: SubscriberId) -> bool {
        let mut registry = self.registry.lock().await;
        let removed = registry.senders.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, active = registry.senders.len(), "subscriber detached");
        }
        removed
    }

    /// Deliver `message` to every attached subscriber.
    ///
    /// Returns how many subscribers accepted the frame. Delivery
    /// failures are never reported to the caller.
    pub async fn broadcast(&self, message: &Notification) -> usize {
        let mut registry = self.registry.lock().await;
        let mut delivered: usize = 0;
        let mut closed = Vec::new();

        for (id, tx) in &registry.senders {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id, kind = message.kind(), "subscriber queue full, frame dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            registry.senders.remove(&id);
            debug!(subscriber = %id, "pruned closed subscriber");
        }

        delivered
    }

    /// Detach every subscriber and refuse new ones. Each stream ends
    /// once its queued frames are drained.
    ///
    /// Returns how many subscribers were attached. Closing twice is
    /// harmless.
    pub async fn close(&self) -> usize {
        let mut registry = self.registry.lock().await;
        registry.closed = true;
        let count = registry.senders.len();
        registry.senders.clear();
        debug!(count, "hub closed, all subscribers detached");
        count
    }

    /// Whether [`close`](Self::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.registry.lock().await.closed
    }

    /// Number of currently attached subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.registry.lock().await.senders.len()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use vmc_types::{ItemId, Phase};

    use super::*;

    fn started(n: i64) -> Notification {
        Notification::vend_started(vec![ItemId(n)])
    }

    #[tokio::test]
    async fn attach_delivers_snapshot_first() {
        let hub = NotificationHub::default();
        let mut sub = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;

        assert_eq!(sub.try_recv(), Some(Notification::snapshot(Phase::Idle, Vec::new())));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(hub.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let hub = NotificationHub::default();
        let mut a = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let mut b = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let _ = a.try_recv();
        let _ = b.try_recv();

        assert_eq!(hub.broadcast(&started(1)).await, 2);
        assert_eq!(a.try_recv(), Some(started(1)));
        assert_eq!(b.try_recv(), Some(started(1)));
    }

    #[tokio::test]
    async fn detach_is_idempotent_and_stops_delivery() {
        let hub = NotificationHub::default();
        let mut sub = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let _ = sub.try_recv();

        assert!(hub.detach(sub.id()).await);
        assert!(!hub.detach(sub.id()).await);

        assert_eq!(hub.broadcast(&started(2)).await, 0);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_without_affecting_others() {
        let hub = NotificationHub::default();
        let dead = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let mut live = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let _ = live.try_recv();
        drop(dead);

        assert_eq!(hub.broadcast(&started(3)).await, 1);
        assert_eq!(live.try_recv(), Some(started(3)));
        assert_eq!(hub.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn full_queue_drops_frames_for_that_subscriber_only() {
        let hub = NotificationHub::new(1);
        // Snapshot fills the slow subscriber's single slot.
        let mut slow = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let mut fast = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let _ = fast.try_recv();

        assert_eq!(hub.broadcast(&started(4)).await, 1);
        assert_eq!(fast.try_recv(), Some(started(4)));

        // The slow subscriber is still attached and only missed the frame.
        assert_eq!(slow.try_recv(), Some(Notification::snapshot(Phase::Idle, Vec::new())));
        assert_eq!(hub.subscriber_count().await, 2);
        let done = Notification::vend_complete(vec![ItemId(4)], Utc::now());
        assert_eq!(hub.broadcast(&done).await, 2);
        assert_eq!(slow.try_recv(), Some(done));
    }

    #[tokio::test]
    async fn close_ends_every_stream_after_queued_frames() {
        let hub = NotificationHub::default();
        let mut a = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        let mut b = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;

        assert_eq!(hub.close().await, 2);
        assert_eq!(hub.close().await, 0);
        assert!(hub.is_closed().await);
        assert_eq!(hub.subscriber_count().await, 0);

        assert!(a.recv().await.is_some());
        assert_eq!(a.recv().await, None);
        assert!(b.recv().await.is_some());
        assert_eq!(b.recv().await, None);
    }

    #[tokio::test]
    async fn attach_after_close_yields_snapshot_then_ends() {
        let hub = NotificationHub::default();
        hub.close().await;

        let mut late = hub.attach(Notification::snapshot(Phase::Idle, Vec::new())).await;
        assert_eq!(hub.subscriber_count().await, 0);
        assert_eq!(hub.broadcast(&started(6)).await, 0);

        assert_eq!(late.recv().await, Some(Notification::snapshot(Phase::Idle, Vec::new())));
        assert_eq!(late.recv().await, None);
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_is_not_an_error() {
        let hub = NotificationHub::default();
        assert_eq!(hub.broadcast(&started(5)).await, 0);
    }
}
