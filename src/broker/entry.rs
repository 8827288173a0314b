//! Topic entry and subscription handle types

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

/// Opaque handle for one subscriber of one topic
///
/// Returned by [`Broker::subscribe`](super::Broker::subscribe) and passed back
/// to [`Broker::unsubscribe`](super::Broker::unsubscribe).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub(super) id: u64,
    pub(super) topic: String,
}

impl Subscription {
    /// Topic this subscription belongs to
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.topic, self.id)
    }
}

/// Registry entry for a single topic
pub(super) struct TopicEntry {
    /// Broker end of the publisher's single-slot queue
    pub updates: mpsc::Receiver<Bytes>,

    /// Broker end of the publisher's stop signal
    pub stop: watch::Sender<bool>,

    /// Fan-out set, keyed by subscription id
    pub subscribers: HashMap<u64, mpsc::Sender<Bytes>>,

    pub created_at: Instant,
}

impl TopicEntry {
    pub fn new(updates: mpsc::Receiver<Bytes>, stop: watch::Sender<bool>) -> Self {
        Self {
            updates,
            stop,
            subscribers: HashMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Remove a subscriber; signals stop when the set became empty
    ///
    /// Returns true if stop was signalled.
    pub fn remove_subscriber(&mut self, id: u64) -> bool {
        self.subscribers.remove(&id);
        if self.subscribers.is_empty() {
            self.stop.send_replace(true);
            true
        } else {
            false
        }
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Aggregate broker counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Registered topics (live publishers)
    pub topics: usize,
    /// Subscriptions across all topics
    pub subscribers: usize,
}
