//! Pinger configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for the [`Pinger`](super::Pinger)
#[derive(Debug, Clone)]
pub struct PingerConfig {
    /// Local address of the shared UDP socket
    pub bind_addr: SocketAddr,

    /// How long a resolved peer address stays cached
    pub resolve_ttl: Duration,

    /// Interval of the expired-request sweep
    pub sweep_interval: Duration,

    /// Capacity of each response channel (minimum 1)
    pub response_buffer: usize,

    /// Longest wait for a full response channel before a packet is dropped
    ///
    /// The request's own deadline still applies when it comes first.
    pub forward_timeout: Duration,

    /// Receive buffer size; longer datagrams are truncated
    pub max_packet_size: usize,
}

impl Default for PingerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            resolve_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_millis(500),
            response_buffer: 10,
            forward_timeout: Duration::from_millis(100),
            max_packet_size: 1024,
        }
    }
}

impl PingerConfig {
    /// Create a config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the resolver cache lifetime
    pub fn resolve_ttl(mut self, ttl: Duration) -> Self {
        self.resolve_ttl = ttl;
        self
    }

    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the response channel capacity
    pub fn response_buffer(mut self, capacity: usize) -> Self {
        self.response_buffer = capacity.max(1);
        self
    }

    /// Set the per-packet forward timeout
    pub fn forward_timeout(mut self, timeout: Duration) -> Self {
        self.forward_timeout = timeout;
        self
    }

    /// Set the receive buffer size
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Check the configuration before binding
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(Error::Config("sweep interval must not be zero".into()));
        }
        if self.max_packet_size == 0 {
            return Err(Error::Config("max packet size must not be zero".into()));
        }
        if self.response_buffer == 0 {
            return Err(Error::Config("response buffer must not be zero".into()));
        }
        Ok(())
    }
}
