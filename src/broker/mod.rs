//! Topic-based publish/subscribe broker
//!
//! The broker starts a topic's producer on demand, fans its updates out to
//! every subscriber, and tells the producer to stop once nobody listens.
//!
//! # Architecture
//!
//! ```text
//!                         Broker
//!               ┌────────────────────────────┐
//!               │ topics: HashMap<String,    │
//!               │   TopicEntry {             │
//!               │     updates: mpsc::Rx (1), │
//!               │     stop: watch::Tx,       │
//!               │     subscribers: {id: Tx}, │
//!               │   }                        │
//!               │ >                          │
//!               └──────────────┬─────────────┘
//!                              │
//!   [Publisher] ──publish()──► slot ──notify(topic)──► dispatch loop
//!                                                         │
//!                                  ┌──────────────────────┼─────────────┐
//!                                  ▼                      ▼             ▼
//!                            [Subscription]        [Subscription]      ...
//!                            timed send            timed send
//! ```
//!
//! # Lifecycle
//!
//! 1. The first [`Broker::subscribe`] for a topic calls the factory with a new
//!    [`Publisher`]; the producer task takes ownership of it.
//! 2. Each [`Publisher::publish`] fills the topic's single slot and notifies
//!    the dispatch loop, which delivers the update to every subscriber with a
//!    short per-subscriber timeout. Slow subscribers miss that update.
//! 3. When the last subscription is removed, the publisher's stop signal
//!    fires. The producer closes the publisher, the dispatch loop closes all
//!    subscriber channels and forgets the topic.

pub mod config;
pub mod entry;
pub mod error;
pub mod publisher;
pub mod store;

pub use config::BrokerConfig;
pub use entry::{BrokerStats, Subscription};
pub use error::BrokerError;
pub use publisher::{Publisher, StopSignal};
pub use store::Broker;
