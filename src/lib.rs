//! # extinfo-relay
//!
//! Polls live state from Sauerbraten game servers and the master server and
//! republishes it as JSON snapshots to any number of subscribers.
//!
//! ## Overview
//!
//! - [`broker`]: topic-based pub/sub. A topic's producer is started on the
//!   first subscription and stopped after the last one ends.
//! - [`pinger`]: one UDP socket shared by all queries, matching responses to
//!   requests by peer address.
//! - [`cubecode`]: the game's integer and string encoding.
//! - [`extinfo`]: typed extinfo queries (basic info, client info, team scores,
//!   uptime, mod detection).
//! - [`master`]: master server list client.
//! - [`poller`]: topic producers for single servers and the master list.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use extinfo_relay::broker::Broker;
//! use extinfo_relay::pinger::{Pinger, PingerConfig};
//! use extinfo_relay::poller::{ServerPoller, ServerPollerConfig};
//!
//! # async fn run() -> extinfo_relay::Result<()> {
//! let broker = Broker::new();
//! let pinger = Arc::new(Pinger::bind(PingerConfig::default()).await?);
//!
//! let addr = "144.76.176.131:28785";
//! let (mut updates, subscription) = broker
//!     .subscribe(addr, |publisher| {
//!         ServerPoller::start(publisher, pinger.clone(), ServerPollerConfig::new(addr))
//!     })
//!     .await?;
//!
//! while let Some(update) = updates.recv().await {
//!     println!("{}", String::from_utf8_lossy(&update));
//! }
//!
//! broker.unsubscribe(&subscription).await.ok();
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod cubecode;
pub mod error;
pub mod extinfo;
pub mod master;
pub mod pinger;
pub mod poller;

pub use broker::{Broker, BrokerConfig, Publisher, Subscription};
pub use error::{Error, Result};
pub use pinger::{Pinger, PingerConfig};
pub use poller::{MasterListPoller, ServerPoller, MASTER_TOPIC};
