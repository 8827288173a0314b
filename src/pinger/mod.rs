//! UDP request/response multiplexer
//!
//! All extinfo traffic of the process goes through one socket. The wire
//! protocol has no request ids, so responses are matched to requests by the
//! sender's address.
//!
//! # Architecture
//!
//! ```text
//!   Pinger::send ──Outbound──► Dispatcher ──send_to──► UdpSocket
//!                                 │  ▲                     │
//!             pending: {addr ──►  │  └────Inbound──── read_loop
//!               Sender, deadline} │
//!                                 ▼
//!                        Response (mpsc, buffered)
//! ```
//!
//! The dispatcher task is the only owner of the pending table. Forwarding a
//! packet to its response stream is bounded by that request's deadline and by
//! the configured forward timeout, whichever comes first; a packet that does
//! not fit in time is dropped. A periodic sweep drops expired requests, which
//! ends their streams.

pub mod config;
mod dispatch;
pub mod handle;
pub mod resolver;

pub use config::PingerConfig;
pub use handle::{Pinger, Response};
pub use resolver::Resolver;
