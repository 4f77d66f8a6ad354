//! Broadcast hub
//!
//! Explicit publish/subscribe registry, one topic per project id. Every
//! accepted contribution publishes the full post-update snapshot; all
//! receivers on that topic see snapshots in publish order (FIFO per topic,
//! the broadcast channel's guarantee). Dropping a receiver unsubscribes the
//! connection; that is naturally idempotent.
//!
//! The hub does not know whether a project exists. Connection handlers check
//! the store before subscribing, so a join for a missing project is answered
//! to the requester alone and never reaches a topic.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::project::Project;

/// Default per-topic channel capacity
pub const DEFAULT_CAPACITY: usize = 64;

/// Per-project snapshot fan-out
pub struct BroadcastHub {
    topics: DashMap<String, broadcast::Sender<Project>>,
    capacity: usize,
}

impl BroadcastHub {
    /// Create a hub whose topics buffer up to `capacity` snapshots
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a project's snapshot stream
    ///
    /// The topic is created on first use. Dropping the receiver is the
    /// unsubscribe.
    pub fn subscribe(&self, project_id: &str) -> broadcast::Receiver<Project> {
        self.topics
            .entry(project_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver a snapshot to every subscriber of the project's topic
    ///
    /// Returns the number of receivers the snapshot was queued for. Topics
    /// without subscribers are pruned as a side effect.
    pub fn publish(&self, project_id: &str, snapshot: Project) -> usize {
        let delivered = match self.topics.get(project_id) {
            Some(sender) => sender.send(snapshot).unwrap_or(0),
            None => 0,
        };

        if delivered == 0 {
            // Last subscriber is gone; drop the topic so ids do not pile up
            self.topics
                .remove_if(project_id, |_, sender| sender.receiver_count() == 0);
            debug!(project = %project_id, "published with no subscribers");
        }
        delivered
    }

    /// Current subscriber count for a project
    pub fn subscriber_count(&self, project_id: &str) -> usize {
        self.topics
            .get(project_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of live topics
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::gold_project;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn test_both_subscribers_see_same_order() {
        let hub = BroadcastHub::default();
        let mut rx_a = hub.subscribe("P1");
        let mut rx_b = hub.subscribe("P1");

        let mut first = gold_project("P1");
        first.contributed.insert("Gold".to_string(), 40);
        let mut second = gold_project("P1");
        second.contributed.insert("Gold".to_string(), 100);

        assert_eq!(hub.publish("P1", first), 2);
        assert_eq!(hub.publish("P1", second), 2);

        for rx in [&mut rx_a, &mut rx_b] {
            let one = rx.recv().await.unwrap();
            let two = rx.recv().await.unwrap();
            assert_eq!(one.contributed.get("Gold"), Some(&40));
            assert_eq!(two.contributed.get("Gold"), Some(&100));
        }
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let hub = BroadcastHub::default();
        let mut rx_other = hub.subscribe("P2");

        hub.subscribe("P1");
        hub.publish("P1", gold_project("P1"));

        assert!(matches!(rx_other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = BroadcastHub::default();
        assert_eq!(hub.publish("P1", gold_project("P1")), 0);
        assert_eq!(hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let hub = BroadcastHub::default();
        let rx = hub.subscribe("P1");
        assert_eq!(hub.subscriber_count("P1"), 1);

        drop(rx);
        assert_eq!(hub.subscriber_count("P1"), 0);

        // Next publish notices the empty topic and prunes it
        hub.publish("P1", gold_project("P1"));
        assert_eq!(hub.topic_count(), 0);
    }
}
