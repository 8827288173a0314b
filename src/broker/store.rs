//! Broker implementation
//!
//! The registry maps each topic to its publisher queue, stop signal and
//! subscriber set. One dispatch task drains publisher queues and fans
//! updates out.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::config::BrokerConfig;
use super::entry::{BrokerStats, Subscription, TopicEntry};
use super::error::BrokerError;
use super::publisher::Publisher;
use crate::error::Result;

type Topics = Arc<Mutex<HashMap<String, TopicEntry>>>;

/// Topic-based pub/sub broker
///
/// Must be created inside a Tokio runtime; the dispatch task is spawned on
/// construction and aborted when the broker is dropped.
pub struct Broker {
    topics: Topics,

    /// Publishers clone this to announce "topic has data"
    notify: mpsc::UnboundedSender<String>,

    next_subscription_id: AtomicU64,

    config: BrokerConfig,

    dispatch_handle: JoinHandle<()>,
}

impl Broker {
    /// Create a broker with default configuration
    pub fn new() -> Self {
        Self::spawn(BrokerConfig::default())
    }

    /// Create a broker with custom configuration
    ///
    /// Fails if the configuration does not validate.
    pub fn with_config(config: BrokerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::spawn(config))
    }

    fn spawn(config: BrokerConfig) -> Self {
        let topics: Topics = Arc::new(Mutex::new(HashMap::new()));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let dispatch_handle = tokio::spawn(dispatch_loop(
            Arc::clone(&topics),
            notify_rx,
            config.clone(),
        ));

        Self {
            topics,
            notify: notify_tx,
            next_subscription_id: AtomicU64::new(1),
            config,
            dispatch_handle,
        }
    }

    /// Get the broker configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Subscribe to a topic
    ///
    /// If the topic has no publisher yet, `factory` is called with a fresh
    /// [`Publisher`] and is expected to start the producer (typically by
    /// spawning a task that owns it). The factory runs under the registry lock,
    /// so concurrent first subscriptions start exactly one producer. If the
    /// factory fails, nothing is registered and its error is returned.
    pub async fn subscribe<F>(
        &self,
        topic: &str,
        factory: F,
    ) -> Result<(mpsc::Receiver<Bytes>, Subscription)>
    where
        F: FnOnce(Publisher) -> Result<()>,
    {
        let mut topics = self.topics.lock().await;

        let entry = match topics.entry(topic.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let (publisher, updates, stop) = Publisher::new(topic, self.notify.clone());
                factory(publisher)?;

                tracing::info!(topic = %topic, "Topic created");
                vacant.insert(TopicEntry::new(updates, stop))
            }
        };

        if entry.is_stopping() {
            tracing::debug!(topic = %topic, "Subscribing to a topic that is shutting down");
        }

        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer.max(1));
        entry.subscribers.insert(id, tx);

        tracing::debug!(
            topic = %topic,
            subscription = id,
            subscribers = entry.subscribers.len(),
            "Subscriber added"
        );

        Ok((
            rx,
            Subscription {
                id,
                topic: topic.to_string(),
            },
        ))
    }

    /// Remove a subscription
    ///
    /// When the topic's last subscriber leaves, its publisher is told to stop.
    /// The topic stays registered until the publisher closes.
    pub async fn unsubscribe(
        &self,
        subscription: &Subscription,
    ) -> std::result::Result<(), BrokerError> {
        let mut topics = self.topics.lock().await;

        let entry = topics
            .get_mut(&subscription.topic)
            .ok_or_else(|| BrokerError::NoSuchTopic(subscription.topic.clone()))?;

        let stopping = entry.remove_subscriber(subscription.id);

        tracing::debug!(
            topic = %subscription.topic,
            subscription = subscription.id,
            subscribers = entry.subscribers.len(),
            "Subscriber removed"
        );
        if stopping {
            tracing::info!(topic = %subscription.topic, "Last subscriber left, stopping publisher");
        }

        Ok(())
    }

    /// Check if a topic is registered
    pub async fn has_topic(&self, topic: &str) -> bool {
        self.topics.lock().await.contains_key(topic)
    }

    /// Number of subscribers of a topic
    pub async fn subscriber_count(&self, topic: &str) -> Option<usize> {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|entry| entry.subscribers.len())
    }

    /// Aggregate counts over all topics
    pub async fn stats(&self) -> BrokerStats {
        stats_of(&*self.topics.lock().await)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.dispatch_handle.abort();
    }
}

fn stats_of(topics: &HashMap<String, TopicEntry>) -> BrokerStats {
    BrokerStats {
        topics: topics.len(),
        subscribers: topics.values().map(|e| e.subscribers.len()).sum(),
    }
}

async fn dispatch_loop(
    topics: Topics,
    mut notify: mpsc::UnboundedReceiver<String>,
    config: BrokerConfig,
) {
    let mut status = tokio::time::interval_at(
        tokio::time::Instant::now() + config.status_interval,
        config.status_interval,
    );

    loop {
        tokio::select! {
            topic = notify.recv() => {
                let Some(topic) = topic else {
                    break;
                };
                dispatch(&topics, &topic, &config).await;
            }
            _ = status.tick() => {
                let stats = stats_of(&*topics.lock().await);
                if stats.topics > 0 {
                    tracing::info!(
                        topics = stats.topics,
                        subscribers = stats.subscribers,
                        "Broker status"
                    );
                }
            }
        }
    }
}

/// Deliver the pending update of `topic`, or tear the topic down if its
/// publisher closed
async fn dispatch(topics: &Topics, topic: &str, config: &BrokerConfig) {
    let (message, subscribers) = {
        let mut guard = topics.lock().await;

        let Some(entry) = guard.get_mut(topic) else {
            tracing::debug!(topic = %topic, "Notification for unknown topic");
            return;
        };

        match entry.updates.try_recv() {
            Ok(message) => {
                let subscribers: Vec<(u64, mpsc::Sender<Bytes>)> = entry
                    .subscribers
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect();
                (message, subscribers)
            }
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                // dropping the entry drops every subscriber sender
                if let Some(entry) = guard.remove(topic) {
                    tracing::info!(
                        topic = %topic,
                        subscribers = entry.subscribers.len(),
                        age_secs = entry.created_at.elapsed().as_secs(),
                        "Topic removed"
                    );
                }
                return;
            }
        }
    };

    let mut gone = Vec::new();
    for (id, tx) in subscribers {
        match tokio::time::timeout(config.send_timeout, tx.send(message.clone())).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => gone.push(id),
            Err(_) => {
                tracing::debug!(topic = %topic, subscription = id, "Send timed out for subscriber");
            }
        }
    }

    if !gone.is_empty() {
        let mut guard = topics.lock().await;
        if let Some(entry) = guard.get_mut(topic) {
            for id in gone {
                if !entry.subscribers.contains_key(&id) {
                    continue;
                }
                tracing::debug!(topic = %topic, subscription = id, "Dropped subscriber removed");
                if entry.remove_subscriber(id) {
                    tracing::info!(topic = %topic, "Last subscriber dropped, stopping publisher");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    /// Factory that hands the publisher out to the test
    fn capture(slot: &mut Option<Publisher>) -> impl FnOnce(Publisher) -> Result<()> + '_ {
        move |publisher| {
            *slot = Some(publisher);
            Ok(())
        }
    }

    async fn recv(rx: &mut mpsc::Receiver<Bytes>) -> Option<Bytes> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("receive timed out")
    }

    #[tokio::test]
    async fn test_subscribe_creates_publisher_once() {
        let broker = Broker::new();
        let calls = AtomicUsize::new(0);
        let publishers = std::sync::Mutex::new(Vec::new());

        let (calls_ref, publishers_ref) = (&calls, &publishers);
        let factory = move || {
            move |p: Publisher| -> Result<()> {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                publishers_ref.lock().unwrap().push(p);
                Ok(())
            }
        };
        let (_rx1, _s1) = broker.subscribe("t", factory()).await.unwrap();
        let (_rx2, _s2) = broker.subscribe("t", factory()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(broker.subscriber_count("t").await, Some(2));
    }

    #[tokio::test]
    async fn test_publish_fans_out() {
        let broker = Broker::new();
        let mut slot = None;

        let (mut rx1, _s1) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        let (mut rx2, _s2) = broker.subscribe("t", |_| Ok(())).await.unwrap();
        let publisher = slot.unwrap();

        publisher.publish(Bytes::from_static(b"hello")).await.unwrap();

        assert_eq!(recv(&mut rx1).await, Some(Bytes::from_static(b"hello")));
        assert_eq!(recv(&mut rx2).await, Some(Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn test_updates_arrive_in_publish_order() {
        let broker =
            Broker::with_config(BrokerConfig::default().send_timeout(Duration::from_secs(1))).unwrap();
        let mut slot = None;

        let (mut rx, _s) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        let publisher = slot.unwrap();

        let producer = tokio::spawn(async move {
            for i in 0..5u8 {
                publisher.publish(Bytes::from(vec![i])).await.unwrap();
            }
        });

        for i in 0..5u8 {
            assert_eq!(recv(&mut rx).await, Some(Bytes::from(vec![i])));
        }
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_last_unsubscribe_stops_publisher() {
        let broker = Broker::new();
        let mut slot = None;

        let (_rx1, s1) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        let (_rx2, s2) = broker.subscribe("t", |_| Ok(())).await.unwrap();
        let mut publisher = slot.unwrap();

        broker.unsubscribe(&s1).await.unwrap();
        assert!(!publisher.is_stopped());
        assert!(broker.has_topic("t").await);

        broker.unsubscribe(&s2).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), publisher.stopped())
            .await
            .unwrap();

        // still registered until the publisher closes
        assert!(broker.has_topic("t").await);
        publisher.close();

        tokio::time::timeout(Duration::from_secs(1), async {
            while broker.has_topic("t").await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_close_closes_subscribers() {
        let broker = Broker::new();
        let mut slot = None;

        let (mut rx, _s) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        let publisher = slot.unwrap();

        publisher.publish(Bytes::from_static(b"last")).await.unwrap();
        publisher.close();

        assert_eq!(recv(&mut rx).await, Some(Bytes::from_static(b"last")));
        assert_eq!(recv(&mut rx).await, None);
        assert!(!broker.has_topic("t").await);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_topic() {
        let broker = Broker::new();
        let mut slot = None;

        let (_rx, sub) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        drop(slot);

        // publisher dropped, topic goes away
        tokio::time::timeout(Duration::from_secs(1), async {
            while broker.has_topic("t").await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            broker.unsubscribe(&sub).await,
            Err(BrokerError::NoSuchTopic("t".into()))
        );
    }

    #[tokio::test]
    async fn test_factory_error_registers_nothing() {
        let broker = Broker::new();

        let result = broker
            .subscribe("t", |_| Err(crate::error::Error::Config("bad address".into())))
            .await;

        assert!(result.is_err());
        assert!(!broker.has_topic("t").await);
    }

    #[tokio::test]
    async fn test_with_config_rejects_invalid() {
        let config = BrokerConfig {
            status_interval: Duration::ZERO,
            ..Default::default()
        };

        assert!(matches!(
            Broker::with_config(config),
            Err(crate::error::Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_skipped() {
        let broker =
            Broker::with_config(BrokerConfig::default().send_timeout(Duration::from_millis(10))).unwrap();
        let mut slot = None;

        let (_stalled, _s1) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        let (mut active, _s2) = broker.subscribe("t", |_| Ok(())).await.unwrap();
        let publisher = slot.unwrap();

        // the stalled subscriber never reads; its single slot fills up
        for i in 0..3u8 {
            publisher.publish(Bytes::from(vec![i])).await.unwrap();
            assert_eq!(recv(&mut active).await, Some(Bytes::from(vec![i])));
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let broker = Broker::new();
        let mut slot = None;

        let (rx, _s) = broker.subscribe("t", capture(&mut slot)).await.unwrap();
        let mut publisher = slot.unwrap();
        drop(rx);

        publisher.publish(Bytes::from_static(b"x")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), publisher.stopped())
            .await
            .unwrap();
        assert_eq!(broker.subscriber_count("t").await, Some(0));
    }

    #[tokio::test]
    async fn test_stats() {
        let broker = Broker::new();

        let (_a1, _) = broker.subscribe("a", |_| Ok(())).await.unwrap();
        let (_a2, _) = broker.subscribe("a", |_| Ok(())).await.unwrap();
        let mut slot = None;
        let (_b1, _) = broker.subscribe("b", capture(&mut slot)).await.unwrap();

        // "a" lost its publisher when the factory dropped it
        tokio::time::timeout(Duration::from_secs(1), async {
            while broker.has_topic("a").await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            broker.stats().await,
            BrokerStats {
                topics: 1,
                subscribers: 1
            }
        );
    }
}
