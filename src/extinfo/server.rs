//! Query handle for one game server

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::client_info::{parse_client_numbers, ClientInfo};
use super::{
    parse_response, BasicInfo, FieldContext, ServerMod, TeamScores, ALL_CLIENTS,
    EXT_CLIENT_INFO, EXT_TEAM_SCORES, EXT_UPTIME, INFO_TYPE_BASIC, INFO_TYPE_EXTENDED,
};
use crate::cubecode::Packet;
use crate::error::{CodecError, Error, ExtinfoError, Result};
use crate::pinger::Pinger;

/// A game server reachable through a shared [`Pinger`]
#[derive(Debug, Clone)]
pub struct Server {
    pinger: Arc<Pinger>,
    host: String,
    port: u16,
    timeout: Duration,
}

impl Server {
    /// Create a handle for the server whose game port is `port`
    pub fn new(pinger: Arc<Pinger>, host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            pinger,
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Create a handle from a `host:port` address
    pub fn from_addr(pinger: Arc<Pinger>, addr: &str, timeout: Duration) -> Result<Self> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| Error::Config(format!("address {:?} has no port", addr)))?;
        let port = port
            .parse()
            .map_err(|_| Error::Config(format!("address {:?} has an invalid port", addr)))?;

        Ok(Self::new(pinger, host, port, timeout))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` of the game port
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Query basic info
    pub async fn basic_info(&self) -> Result<BasicInfo> {
        let mut packet = self.query(&[INFO_TYPE_BASIC]).await?;
        Ok(BasicInfo::parse(&mut packet)?)
    }

    /// Query the server uptime in seconds
    pub async fn uptime(&self) -> Result<i32> {
        let mut packet = self.query(&[INFO_TYPE_EXTENDED, EXT_UPTIME]).await?;
        Ok(packet.read_int().field("uptime")?)
    }

    /// Detect the server modification
    ///
    /// Modded servers append an identifier after the uptime when asked for one
    /// extra byte. `None` means no mod could be detected, most likely vanilla.
    pub async fn server_mod(&self) -> Result<Option<ServerMod>> {
        let mut packet = self.query(&[INFO_TYPE_EXTENDED, EXT_UPTIME, 1]).await?;
        packet.read_int().field("uptime")?;

        match packet.read_int() {
            Ok(code) => Ok(Some(ServerMod::from(code))),
            Err(CodecError::BufferTooShort) => Ok(None),
            Err(e) => Err(ExtinfoError::Field {
                field: "server mod",
                source: e,
            }
            .into()),
        }
    }

    /// Query team scores
    ///
    /// Fails with [`ExtinfoError::NotTeamMode`] unless a team mode is running.
    pub async fn team_scores(&self) -> Result<TeamScores> {
        let mut packet = self.query(&[INFO_TYPE_EXTENDED, EXT_TEAM_SCORES]).await?;
        Ok(TeamScores::parse(&mut packet)?)
    }

    /// Query stats of one client, keyed by client number
    pub async fn client_info(&self, cn: i32) -> Result<BTreeMap<i32, ClientInfo>> {
        let request = [INFO_TYPE_EXTENDED, EXT_CLIENT_INFO, cn as u8];
        let mut response = self
            .pinger
            .send(&self.host, self.port, Bytes::copy_from_slice(&request), self.timeout)
            .await?;

        let first = response.recv().await.ok_or_else(|| self.timed_out())?;
        let cns = parse_client_numbers(&mut parse_response(&request, first)?)?;

        let mut clients = BTreeMap::new();
        for _ in 0..cns.len() {
            let packet = response.recv().await.ok_or_else(|| self.timed_out())?;
            let info = ClientInfo::parse(&mut parse_response(&request, packet)?)?;
            clients.insert(info.cn, info);
        }
        response.cancel();

        tracing::trace!(
            server = %self.addr(),
            expected = cns.len(),
            received = clients.len(),
            "Client info received"
        );

        Ok(clients)
    }

    /// Query stats of every connected client
    pub async fn all_client_info(&self) -> Result<BTreeMap<i32, ClientInfo>> {
        self.client_info(ALL_CLIENTS).await
    }

    async fn query(&self, request: &[u8]) -> Result<Packet> {
        let response = self
            .pinger
            .expect_single_packet(
                &self.host,
                self.port,
                Bytes::copy_from_slice(request),
                self.timeout,
            )
            .await
            .map_err(|e| match e {
                Error::Extinfo(ExtinfoError::Timeout { .. }) => self.timed_out(),
                other => other,
            })?;

        Ok(parse_response(request, response)?)
    }

    fn timed_out(&self) -> Error {
        ExtinfoError::Timeout { addr: self.addr() }.into()
    }
}
