//! Master server directory
//!
//! The master server keeps the list of public game servers. It speaks a line
//! protocol over TCP: the client sends `list`, the master answers with one
//! `addserver <ip> <port>` line per server and ends the list with a line that
//! holds a single NUL byte.

pub mod client;

pub use client::{MasterClient, DEFAULT_MASTER_ADDR};
