//! Master list poller
//!
//! Keeps one basic-info [`ServerPoller`] subscription per server on the master
//! list and publishes the populated servers as one JSON array.
//!
//! ```text
//!   MasterClient ──refresh──► diff ──subscribe/unsubscribe──► Broker
//!                                                             │
//!   per-server updates ──forwarder tasks──► merge channel ◄───┘
//!                                               │
//!                        servers: {addr: BasicInfo} ──update tick──► publish
//! ```
//!
//! A nested poller that ends on its own (failed initial poll, error budget)
//! closes its topic. The forwarder reports that, the server is forgotten, and
//! the next refresh subscribes again if the master still lists it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::config::{MasterPollerConfig, ServerPollerConfig};
use super::server::{ServerPoller, ServerStateUpdate};
use crate::broker::{Broker, BrokerError, Publisher, Subscription};
use crate::error::Result;
use crate::extinfo::BasicInfo;
use crate::master::MasterClient;
use crate::pinger::Pinger;

/// Topic of the aggregated server list
pub const MASTER_TOPIC: &str = "master";

const MERGE_QUEUE: usize = 64;

/// Message from a forwarder task to the poller
enum Merge {
    /// Snapshot published on a server topic
    Update(String, Bytes),
    /// The subscription's update channel closed
    Closed(Subscription),
}

/// One populated server in the published list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerListEntry {
    pub address: String,
    #[serde(flatten)]
    pub info: BasicInfo,
}

/// Poller publishing the master server's list
pub struct MasterListPoller {
    publisher: Publisher,
    broker: Arc<Broker>,
    pinger: Arc<Pinger>,
    master: MasterClient,
    config: MasterPollerConfig,
    /// Listed servers and their last basic info
    servers: BTreeMap<String, Option<BasicInfo>>,
    subscriptions: HashMap<String, Subscription>,
    merge_tx: mpsc::Sender<Merge>,
    merge_rx: mpsc::Receiver<Merge>,
}

impl MasterListPoller {
    /// Validate `config` and spawn a poller task that owns `publisher`
    pub fn start(
        publisher: Publisher,
        broker: Arc<Broker>,
        pinger: Arc<Pinger>,
        config: MasterPollerConfig,
    ) -> Result<()> {
        config.validate()?;

        let poller = Self::new(publisher, broker, pinger, config);
        tokio::spawn(poller.run());

        Ok(())
    }

    fn new(
        publisher: Publisher,
        broker: Arc<Broker>,
        pinger: Arc<Pinger>,
        config: MasterPollerConfig,
    ) -> Self {
        let master = MasterClient::new(config.master_addr.clone(), config.dial_timeout);
        let (merge_tx, merge_rx) = mpsc::channel(MERGE_QUEUE);

        Self {
            publisher,
            broker,
            pinger,
            master,
            config,
            servers: BTreeMap::new(),
            subscriptions: HashMap::new(),
            merge_tx,
            merge_rx,
        }
    }

    async fn run(mut self) {
        let mut stop = self.publisher.stop_signal();

        tracing::info!(master = %self.config.master_addr, "Started polling the master server list");

        if let Err(e) = self.refresh().await {
            tracing::warn!(master = %self.config.master_addr, error = %e, "Initial server list refresh failed");
            self.shutdown().await;
            return;
        }
        if let Err(e) = self.publish_update().await {
            tracing::warn!(error = %e, "Publishing first server list failed");
            self.shutdown().await;
            return;
        }

        let now = Instant::now();
        let mut refresh = interval_at(
            now + self.config.refresh_interval,
            self.config.refresh_interval,
        );
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut update = interval_at(now + self.config.update_interval, self.config.update_interval);
        update.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let max_errors = self.config.max_consecutive_errors;
        let mut master_errors = 0u32;
        let mut update_errors = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = stop.stopped() => break,
                Some(merge) = self.merge_rx.recv() => match merge {
                    Merge::Update(addr, payload) => self.store_update(&addr, &payload),
                    Merge::Closed(subscription) => self.forget_closed(&subscription),
                },
                _ = refresh.tick() => match self.refresh().await {
                    Ok(()) => master_errors = 0,
                    Err(e) => {
                        master_errors += 1;
                        tracing::warn!(error = %e, errors = master_errors, "Server list refresh failed");
                        if master_errors > max_errors {
                            tracing::warn!("Problem with master server, giving up");
                            break;
                        }
                    }
                },
                _ = update.tick() => match self.publish_update().await {
                    Ok(()) => update_errors = 0,
                    Err(e) => {
                        update_errors += 1;
                        tracing::warn!(error = %e, errors = update_errors, "Publishing server list failed");
                        if update_errors > max_errors {
                            tracing::warn!("Problem with updates, giving up");
                            break;
                        }
                    }
                },
            }
        }

        self.shutdown().await;
    }

    /// Fetch the list and diff it against the known servers
    async fn refresh(&mut self) -> Result<()> {
        let listed: BTreeSet<String> = self.master.server_list().await?.into_iter().collect();

        let added: Vec<String> = listed
            .iter()
            .filter(|addr| !self.servers.contains_key(*addr))
            .cloned()
            .collect();
        let removed: Vec<String> = self
            .servers
            .keys()
            .filter(|addr| !listed.contains(*addr))
            .cloned()
            .collect();

        for addr in &added {
            match self.subscribe_server(addr).await {
                Ok(()) => {
                    self.servers.insert(addr.clone(), None);
                }
                Err(e) => {
                    tracing::warn!(server = %addr, error = %e, "Could not start server poller");
                }
            }
        }

        for addr in &removed {
            self.unsubscribe_server(addr).await;
            self.servers.remove(addr);
        }

        tracing::debug!(
            servers = self.servers.len(),
            added = added.len(),
            removed = removed.len(),
            "Server list refreshed"
        );

        Ok(())
    }

    async fn subscribe_server(&mut self, addr: &str) -> Result<()> {
        let pinger = Arc::clone(&self.pinger);
        let config =
            ServerPollerConfig::basic_only(addr).query_timeout(self.config.query_timeout);

        let (mut updates, subscription) = self
            .broker
            .subscribe(addr, move |publisher| {
                ServerPoller::start(publisher, pinger, config)
            })
            .await?;

        let merge = self.merge_tx.clone();
        let closed = subscription.clone();
        tokio::spawn(async move {
            while let Some(payload) = updates.recv().await {
                let update = Merge::Update(closed.topic().to_string(), payload);
                if merge.send(update).await.is_err() {
                    return;
                }
            }
            let _ = merge.send(Merge::Closed(closed)).await;
        });

        self.subscriptions.insert(addr.to_string(), subscription);
        Ok(())
    }

    /// Drop a server whose topic closed without being unsubscribed
    fn forget_closed(&mut self, subscription: &Subscription) {
        let addr = subscription.topic();

        // a stale marker from an earlier subscription of the same address
        if self.subscriptions.get(addr) != Some(subscription) {
            return;
        }

        self.subscriptions.remove(addr);
        self.servers.remove(addr);
        tracing::info!(server = %addr, "Server poller ended, resubscribing on next refresh");
    }

    async fn unsubscribe_server(&mut self, addr: &str) {
        let Some(subscription) = self.subscriptions.remove(addr) else {
            return;
        };

        match self.broker.unsubscribe(&subscription).await {
            Ok(()) | Err(BrokerError::NoSuchTopic(_)) => {}
            Err(e) => tracing::debug!(server = %addr, error = %e, "Unsubscribe failed"),
        }
    }

    fn store_update(&mut self, addr: &str, payload: &[u8]) {
        // updates can still arrive from servers dropped from the list
        let Some(slot) = self.servers.get_mut(addr) else {
            return;
        };

        match serde_json::from_slice::<ServerStateUpdate>(payload) {
            Ok(update) => *slot = Some(update.server_info),
            Err(e) => tracing::warn!(server = %addr, error = %e, "Malformed server update"),
        }
    }

    /// Publish every known server with at least one client
    async fn publish_update(&self) -> Result<()> {
        let entries: Vec<ServerListEntry> = self
            .servers
            .iter()
            .filter_map(|(addr, info)| {
                let info = info.as_ref()?;
                (info.num_clients > 0).then(|| ServerListEntry {
                    address: addr.clone(),
                    info: info.clone(),
                })
            })
            .collect();

        let payload = serde_json::to_vec(&entries)?;
        self.publisher.publish(Bytes::from(payload)).await?;
        Ok(())
    }

    async fn shutdown(mut self) {
        let addrs: Vec<String> = self.subscriptions.keys().cloned().collect();
        for addr in &addrs {
            self.unsubscribe_server(addr).await;
        }

        tracing::info!(master = %self.config.master_addr, "Stopped polling the master server list");
        self.publisher.close();
    }
}
