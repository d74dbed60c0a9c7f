//! Publish/subscribe channel for the live feed.
//!
//! Every delivery is a full ordered snapshot of the feed window, newest
//! first, replacing whatever the subscriber held before. Subscribers are
//! independent; canceling one never affects the others.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

use super::Post;

/// One delivery: the whole visible window, descending by creation time.
pub type FeedSnapshot = Arc<Vec<Post>>;

/// Broadcast side of the live feed.
#[derive(Clone)]
pub struct FeedChannel {
    tx: broadcast::Sender<FeedSnapshot>,
    // Snapshot reads and sends are serialized under this lock so every
    // receiver observes states in commit order.
    publish_lock: Arc<Mutex<()>>,
}

impl FeedChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));

        Self {
            tx,
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run `load` and broadcast its result while holding the publish lock.
    pub async fn publish_with<F, Fut, E>(&self, load: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Post>, E>>,
    {
        let _guard = self.publish_lock.lock().await;
        let snapshot = load().await?;

        // A send only fails when nobody is subscribed, which is fine.
        let _ = self.tx.send(Arc::new(snapshot));
        Ok(())
    }

    /// Open an independent subscription delivering at most `limit` posts
    /// per snapshot.
    pub fn subscribe(&self, limit: usize) -> FeedSubscription {
        FeedSubscription {
            rx: self.tx.subscribe(),
            limit,
        }
    }

    /// Subscribe and load the initial snapshot under the publish lock, so
    /// no delivery can ever hand the subscriber a state older than the
    /// one it started from.
    pub async fn subscribe_with<F, Fut, E>(
        &self,
        limit: usize,
        load: F,
    ) -> Result<(FeedSnapshot, FeedSubscription), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Post>, E>>,
    {
        let _guard = self.publish_lock.lock().await;
        let subscription = FeedSubscription {
            rx: self.tx.subscribe(),
            limit,
        };
        let initial = load().await?;

        Ok((subscription.trim(Arc::new(initial)), subscription))
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving side of the live feed. Dropping it releases the server-side
/// listener slot.
pub struct FeedSubscription {
    rx: broadcast::Receiver<FeedSnapshot>,
    limit: usize,
}

impl FeedSubscription {
    /// Wait for the next snapshot. Returns `None` once the channel is
    /// gone. A subscriber that fell behind skips straight to the most
    /// recent retained snapshot; since deliveries replace rather than
    /// diff, nothing is lost.
    pub async fn recv(&mut self) -> Option<FeedSnapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(self.trim(snapshot)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving. Equivalent to dropping the subscription.
    pub fn cancel(self) {}

    fn trim(&self, snapshot: FeedSnapshot) -> FeedSnapshot {
        if snapshot.len() <= self.limit {
            snapshot
        } else {
            Arc::new(snapshot[..self.limit].to_vec())
        }
    }
}
