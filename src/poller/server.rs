//! Per-server poller
//!
//! Polls one game server and publishes a full JSON snapshot of its state on
//! every tick. The poller stops when the broker signals that nobody listens
//! anymore, or after too many failed polls in a row.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::config::ServerPollerConfig;
use crate::broker::{Publisher, StopSignal};
use crate::error::Result;
use crate::extinfo::{BasicInfo, ClientInfo, Server, ServerMod, TeamScore};
use crate::pinger::Pinger;

/// Snapshot published on a server topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStateUpdate {
    #[serde(rename = "serverinfo")]
    pub server_info: BasicInfo,

    /// Only present while a team mode runs and teams are polled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<BTreeMap<String, TeamScore>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<BTreeMap<i32, ClientInfo>>,

    /// Name of the detected server mod
    #[serde(rename = "mod", default, skip_serializing_if = "Option::is_none")]
    pub server_mod: Option<String>,
}

/// Last successfully decoded state of one server
#[derive(Debug, Clone, Default)]
pub struct ServerState {
    pub basic: Option<BasicInfo>,
    pub teams: Option<BTreeMap<String, TeamScore>>,
    pub players: Option<BTreeMap<i32, ClientInfo>>,
    pub server_mod: Option<ServerMod>,
}

impl ServerState {
    /// Build the next snapshot; `None` until basic info was received
    pub fn snapshot(&self) -> Option<ServerStateUpdate> {
        let server_info = self.basic.clone()?;
        let team_mode = server_info.game_mode.is_team_mode();

        Some(ServerStateUpdate {
            server_info,
            teams: self.teams.clone().filter(|_| team_mode),
            players: self.players.clone(),
            server_mod: self.server_mod.map(|m| m.name().to_string()),
        })
    }
}

/// Poller publishing the state of one game server
pub struct ServerPoller {
    publisher: Publisher,
    server: Server,
    config: ServerPollerConfig,
    state: ServerState,
}

impl ServerPoller {
    /// Validate `config` and spawn a poller task that owns `publisher`
    ///
    /// Meant to be called from a [`Broker::subscribe`](crate::broker::Broker::subscribe)
    /// factory.
    pub fn start(
        publisher: Publisher,
        pinger: Arc<Pinger>,
        config: ServerPollerConfig,
    ) -> Result<()> {
        config.validate()?;
        let server = Server::from_addr(pinger, &config.address, config.query_timeout)?;

        let poller = Self {
            publisher,
            server,
            config,
            state: ServerState::default(),
        };
        tokio::spawn(poller.run());

        Ok(())
    }

    async fn run(mut self) {
        let mut stop = self.publisher.stop_signal();

        tracing::info!(server = %self.config.address, "Started polling");

        match self.poll_or_stop(&mut stop).await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                tracing::warn!(server = %self.config.address, error = %e, "Initial poll failed");
                self.finish();
                return;
            }
            None => {
                self.finish();
                return;
            }
        }

        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut errors = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = stop.stopped() => break,
                _ = ticker.tick() => {
                    match self.poll_or_stop(&mut stop).await {
                        None => break,
                        Some(Ok(())) => errors = 0,
                        Some(Err(e)) => {
                            errors += 1;
                            tracing::warn!(
                                server = %self.config.address,
                                error = %e,
                                errors,
                                "Poll failed"
                            );
                            if errors > self.config.max_consecutive_errors {
                                tracing::warn!(
                                    server = %self.config.address,
                                    "Too many failed polls, giving up"
                                );
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.finish();
    }

    /// Poll once, abandoning the poll if stop is signalled meanwhile
    async fn poll_or_stop(&mut self, stop: &mut StopSignal) -> Option<Result<()>> {
        tokio::select! {
            biased;
            _ = stop.stopped() => None,
            result = self.poll() => Some(result),
        }
    }

    async fn poll(&mut self) -> Result<()> {
        let basic = self.server.basic_info().await?;
        let team_mode = basic.game_mode.is_team_mode();
        self.state.basic = Some(basic);

        if self.config.with_mod {
            match self.server.server_mod().await {
                Ok(server_mod) => self.state.server_mod = server_mod,
                Err(e) => {
                    tracing::debug!(server = %self.config.address, error = %e, "Mod detection failed")
                }
            }
        }

        if self.config.with_teams && team_mode {
            self.state.teams = Some(self.server.team_scores().await?.scores);
        } else {
            self.state.teams = None;
        }

        if self.config.with_players {
            self.state.players = Some(self.server.all_client_info().await?);
        }

        if let Some(update) = self.state.snapshot() {
            let payload = serde_json::to_vec(&update)?;
            self.publisher.publish(Bytes::from(payload)).await?;
        }

        Ok(())
    }

    fn finish(self) {
        tracing::info!(server = %self.config.address, "Stopped polling");
        self.publisher.close();
    }
}
