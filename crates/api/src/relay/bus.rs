//! In-process topic registry and fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::topic::{Channel, Topic};

/// Identifies one live connection on the bus.
pub type ConnectionId = Uuid;

/// A message handed to a subscriber.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: Channel,
    pub message: Arc<Value>,
}

/// Topic -> subscribed connections.
///
/// Publishing never awaits: each subscriber has a bounded queue, and a
/// subscriber whose queue is full misses the message. Messages published
/// to one topic reach each subscriber in publish order.
#[derive(Clone, Default)]
pub struct RelayBus {
    topics: Arc<DashMap<Topic, HashMap<ConnectionId, mpsc::Sender<Delivery>>>>,
}

impl std::fmt::Debug for RelayBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayBus")
            .field("topics", &self.topics.len())
            .finish()
    }
}

impl RelayBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier subscription of `connection` to `topic`.
    pub fn subscribe(&self, topic: Topic, connection: ConnectionId, sender: mpsc::Sender<Delivery>) {
        self.topics.entry(topic).or_default().insert(connection, sender);
    }

    /// Returns whether the connection was subscribed.
    pub fn unsubscribe(&self, topic: &Topic, connection: ConnectionId) -> bool {
        let removed = self
            .topics
            .get_mut(topic)
            .map(|mut subscribers| subscribers.remove(&connection).is_some())
            .unwrap_or(false);
        self.topics.remove_if(topic, |_, subscribers| subscribers.is_empty());
        removed
    }

    /// Drops every subscription held by `connection`.
    pub fn disconnect(&self, connection: ConnectionId) {
        self.topics.retain(|_, subscribers| {
            subscribers.remove(&connection);
            !subscribers.is_empty()
        });
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map(|s| s.len()).unwrap_or(0)
    }

    /// Fans `message` out to the subscribers of `topic`.
    ///
    /// Returns how many subscribers accepted it. A topic without subscribers
    /// is a no-op.
    pub fn publish(&self, topic: &Topic, channel: Channel, message: Value) -> usize {
        let delivery = Delivery {
            channel,
            message: Arc::new(message),
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        if let Some(subscribers) = self.topics.get(topic) {
            for (connection, sender) in subscribers.iter() {
                match sender.try_send(delivery.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(topic = %topic, connection = %connection, "Subscriber lagging, message dropped");
                        counter!(
                            "relay_messages_dropped_total",
                            "channel" => channel.as_str(),
                            "reason" => "subscriber_lagging"
                        )
                        .increment(1);
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*connection),
                }
            }
        } else {
            debug!(topic = %topic, "Publish to topic without subscribers");
        }

        for connection in closed {
            self.unsubscribe(topic, connection);
        }
        delivered
    }
}
