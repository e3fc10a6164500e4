//! Event bus: topic-keyed publish/subscribe between component instances.
//!
//! DESIGN
//! ======
//! Each subscriber registers an id, the websocket client it lives on, the
//! topics it listens to, and the sender half of that client's channel.
//! Publishing clones the event once per matching subscriber and stamps the
//! subscriber id into `component_id` so the receiving connection knows which
//! instance to dispatch to.
//!
//! Delivery is fire-and-forget: a full or closed channel drops the event for
//! that subscriber and never blocks the publisher. No ordering is promised
//! between separately published events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use crate::frame::Frame;

// =============================================================================
// TOPICS
// =============================================================================

pub const QUESTION_CREATED: &str = "question.created";
pub const QUESTION_UPDATED: &str = "question.updated";
pub const QUESTION_REPORTED: &str = "question.reported";
pub const QUESTION_DESTROY: &str = "question.destroy";
pub const QUESTION_DESTROYED: &str = "question.destroyed";

// =============================================================================
// TYPES
// =============================================================================

/// Who receives a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every matching subscriber on every connection.
    All,
    /// Matching subscribers living on one websocket client (one page).
    Client(Uuid),
}

struct Subscriber {
    client_id: Uuid,
    topics: HashSet<&'static str>,
    tx: mpsc::Sender<Frame>,
}

/// Shared bus handle. Clone is cheap; all clones see the same subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<Uuid, Subscriber>>>,
}

// =============================================================================
// SUBSCRIBE / UNSUBSCRIBE
// =============================================================================

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a subscriber.
    pub async fn subscribe(&self, subscriber_id: Uuid, client_id: Uuid, topics: &[&'static str], tx: mpsc::Sender<Frame>) {
        let subscriber = Subscriber { client_id, topics: topics.iter().copied().collect(), tx };
        self.subscribers
            .write()
            .await
            .insert(subscriber_id, subscriber);
        debug!(%subscriber_id, %client_id, topics = topics.len(), "bus: subscribed");
    }

    /// Remove one subscriber. Returns whether it was registered.
    pub async fn unsubscribe(&self, subscriber_id: Uuid) -> bool {
        self.subscribers
            .write()
            .await
            .remove(&subscriber_id)
            .is_some()
    }

    /// Remove every subscriber living on a client. Returns how many were removed.
    pub async fn unsubscribe_client(&self, client_id: Uuid) -> usize {
        let mut subscribers = self.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|_, sub| sub.client_id != client_id);
        before - subscribers.len()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

// =============================================================================
// PUBLISH
// =============================================================================

impl EventBus {
    /// Deliver `event` to every subscriber in `audience` listening on its
    /// topic. Returns the number of subscribers that accepted it.
    pub async fn publish(&self, event: &Frame, audience: Audience) -> usize {
        let subscribers = self.subscribers.read().await;
        let mut delivered = 0;

        for (subscriber_id, sub) in subscribers.iter() {
            if let Audience::Client(client_id) = audience {
                if sub.client_id != client_id {
                    continue;
                }
            }
            if !sub.topics.contains(event.event.as_str()) {
                continue;
            }
            let copy = event.clone().with_component_id(*subscriber_id);
            match sub.tx.try_send(copy) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(%subscriber_id, event = %event.event, error = %e, "bus: delivery dropped"),
            }
        }

        delivered
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod tests;
