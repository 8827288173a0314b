//! Broker configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for the [`Broker`](super::Broker)
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// How long fan-out waits on one subscriber before skipping it
    pub send_timeout: Duration,

    /// Interval of the diagnostic status log
    pub status_interval: Duration,

    /// Capacity of each subscriber's update channel (minimum 1)
    pub subscriber_buffer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(10),
            status_interval: Duration::from_secs(60),
            subscriber_buffer: 1,
        }
    }
}

impl BrokerConfig {
    /// Set the per-subscriber send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the status log interval (minimum 1ms)
    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the subscriber channel capacity
    pub fn subscriber_buffer(mut self, capacity: usize) -> Self {
        self.subscriber_buffer = capacity.max(1);
        self
    }

    /// Check the configuration before starting a broker
    pub fn validate(&self) -> Result<()> {
        if self.status_interval.is_zero() {
            return Err(Error::Config("status interval must not be zero".into()));
        }
        if self.subscriber_buffer == 0 {
            return Err(Error::Config("subscriber buffer must not be zero".into()));
        }
        Ok(())
    }
}
