//! Producer side of a topic
//!
//! A [`Publisher`] is handed to the factory passed to
//! [`Broker::subscribe`](super::Broker::subscribe). The producer task owns it,
//! publishes through it, watches its stop signal, and closes it when done.

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use super::error::BrokerError;

/// Producer handle for one topic
pub struct Publisher {
    topic: String,
    /// Single-slot queue read by the dispatch loop. `None` once closed.
    updates: Option<mpsc::Sender<Bytes>>,
    notify: mpsc::UnboundedSender<String>,
    stop: StopSignal,
}

impl Publisher {
    /// Create a publisher for `topic`
    ///
    /// Returns the publisher, the broker's end of its update queue, and the
    /// broker's end of its stop signal.
    pub(super) fn new(
        topic: &str,
        notify: mpsc::UnboundedSender<String>,
    ) -> (Self, mpsc::Receiver<Bytes>, watch::Sender<bool>) {
        let (updates_tx, updates_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);

        let publisher = Self {
            topic: topic.to_string(),
            updates: Some(updates_tx),
            notify,
            stop: StopSignal { rx: stop_rx },
        };

        (publisher, updates_rx, stop_tx)
    }

    /// Topic this publisher produces for
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish an update as the topic's latest message
    ///
    /// Waits while the previous update has not been picked up yet.
    pub async fn publish(&self, update: Bytes) -> Result<(), BrokerError> {
        let updates = self.updates.as_ref().ok_or(BrokerError::BrokerClosed)?;

        updates
            .send(update)
            .await
            .map_err(|_| BrokerError::BrokerClosed)?;
        self.notify
            .send(self.topic.clone())
            .map_err(|_| BrokerError::BrokerClosed)
    }

    /// Whether the broker asked this publisher to stop
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Wait until the broker asks this publisher to stop
    pub async fn stopped(&mut self) {
        self.stop.stopped().await
    }

    /// Independent handle on the stop signal, for use in `select!` loops
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// End the stream
    ///
    /// The broker closes every subscriber channel of the topic and forgets it.
    /// Dropping the publisher has the same effect.
    pub fn close(self) {}
}

impl Drop for Publisher {
    fn drop(&mut self) {
        // the queue must be disconnected before the broker looks at it
        if self.updates.take().is_some() {
            let _ = self.notify.send(self.topic.clone());
        }
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Broker to producer stop signal
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Whether stop was signalled (a vanished broker counts as stop)
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait for the stop signal
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
