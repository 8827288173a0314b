//! Topic producers
//!
//! Pollers are started from [`Broker::subscribe`](crate::broker::Broker::subscribe)
//! factories and own the topic's [`Publisher`](crate::broker::Publisher):
//!
//! - [`ServerPoller`] publishes one game server's state on the topic named
//!   after the server address.
//! - [`MasterListPoller`] publishes the populated servers of the master list on
//!   [`MASTER_TOPIC`]. It subscribes to a basic-info server topic for every
//!   listed server and merges their updates.
//!
//! Both poll once right away and give up if that fails. After that each
//! failure counts against a budget of consecutive errors; a success resets it.

pub mod config;
pub mod master;
pub mod server;

pub use config::{MasterPollerConfig, ServerPollerConfig};
pub use master::{MasterListPoller, ServerListEntry, MASTER_TOPIC};
pub use server::{ServerPoller, ServerState, ServerStateUpdate};
