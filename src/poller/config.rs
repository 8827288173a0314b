//! Poller configuration

use std::time::Duration;

use crate::error::{Error, Result};
use crate::master::DEFAULT_MASTER_ADDR;

/// Configuration for a [`ServerPoller`](super::ServerPoller)
#[derive(Debug, Clone)]
pub struct ServerPollerConfig {
    /// `host:port` of the game server (game port, not info port)
    pub address: String,

    /// Query team scores while a team mode is running
    pub with_teams: bool,

    /// Query stats of all connected clients
    pub with_players: bool,

    /// Detect the server modification
    pub with_mod: bool,

    /// Time between polls
    pub poll_interval: Duration,

    /// Deadline for each query
    pub query_timeout: Duration,

    /// Failed polls in a row tolerated before the poller gives up
    pub max_consecutive_errors: u32,
}

impl ServerPollerConfig {
    /// Poll basic info, mod, teams and players of `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            with_teams: true,
            with_players: true,
            with_mod: true,
            poll_interval: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
            max_consecutive_errors: 10,
        }
    }

    /// Poll nothing but basic info, as the master list needs
    pub fn basic_only(address: impl Into<String>) -> Self {
        Self {
            with_teams: false,
            with_players: false,
            with_mod: false,
            ..Self::new(address)
        }
    }

    pub fn with_teams(mut self, enabled: bool) -> Self {
        self.with_teams = enabled;
        self
    }

    pub fn with_players(mut self, enabled: bool) -> Self {
        self.with_players = enabled;
        self
    }

    pub fn with_mod(mut self, enabled: bool) -> Self {
        self.with_mod = enabled;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Check the configuration before starting a poller
    pub fn validate(&self) -> Result<()> {
        validate_address(&self.address)?;
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must not be zero".into()));
        }
        if self.query_timeout.is_zero() {
            return Err(Error::Config("query timeout must not be zero".into()));
        }
        Ok(())
    }
}

/// Configuration for a [`MasterListPoller`](super::MasterListPoller)
#[derive(Debug, Clone)]
pub struct MasterPollerConfig {
    /// `host:port` of the master server
    pub master_addr: String,

    /// Time between server list refreshes
    pub refresh_interval: Duration,

    /// Time between published list updates
    pub update_interval: Duration,

    /// Deadline for connecting to the master server
    pub dial_timeout: Duration,

    /// Query deadline of the per-server pollers
    pub query_timeout: Duration,

    /// Failures in a row tolerated, counted separately for refreshes and updates
    pub max_consecutive_errors: u32,
}

impl Default for MasterPollerConfig {
    fn default() -> Self {
        Self {
            master_addr: DEFAULT_MASTER_ADDR.to_string(),
            refresh_interval: Duration::from_secs(30),
            update_interval: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(15),
            query_timeout: Duration::from_secs(10),
            max_consecutive_errors: 10,
        }
    }
}

impl MasterPollerConfig {
    /// Create a config for a custom master server
    pub fn with_master(addr: impl Into<String>) -> Self {
        Self {
            master_addr: addr.into(),
            ..Default::default()
        }
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Check the configuration before starting a poller
    pub fn validate(&self) -> Result<()> {
        validate_address(&self.master_addr)?;
        if self.refresh_interval.is_zero() || self.update_interval.is_zero() {
            return Err(Error::Config("poll intervals must not be zero".into()));
        }
        if self.dial_timeout.is_zero() {
            return Err(Error::Config("dial timeout must not be zero".into()));
        }
        Ok(())
    }
}

fn validate_address(addr: &str) -> Result<()> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(Error::Config(format!(
            "address {:?} is not of the form host:port",
            addr
        ))),
    }
}
