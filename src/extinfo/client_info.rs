//! Per-client stats
//!
//! A client info query is answered with several packets: first the list of
//! client numbers, then one stats packet per listed client, in any order.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::names::{Privilege, State, Weapon};
use super::{FieldContext, CLIENT_INFO_RESPONSE_CNS, CLIENT_INFO_RESPONSE_STATS};
use crate::cubecode::Packet;
use crate::error::ExtinfoError;

/// Stats of one connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub cn: i32,
    pub ping: i32,
    pub name: String,
    /// Team name, e.g. "good"
    pub team: String,
    pub frags: i32,
    pub flags: i32,
    pub deaths: i32,
    pub teamkills: i32,
    /// Damage dealt * 100 / damage possible
    pub accuracy: i32,
    pub health: i32,
    pub armour: i32,
    pub weapon: Weapon,
    pub privilege: Privilege,
    pub state: State,
    /// Servers only send the first three octets; the last one is always 0
    pub ip: Ipv4Addr,
}

impl ClientInfo {
    /// Decode a stats packet
    pub fn parse(packet: &mut Packet) -> Result<Self, ExtinfoError> {
        expect_packet_type(packet, CLIENT_INFO_RESPONSE_STATS)?;

        let cn = packet.read_int().field("client number")?;
        let ping = packet.read_int().field("ping")?;
        let name = packet.read_string().field("client name")?;
        let team = packet.read_string().field("team")?;
        let frags = packet.read_int().field("frags")?;
        let flags = packet.read_int().field("flags")?;
        let deaths = packet.read_int().field("deaths")?;
        let teamkills = packet.read_int().field("teamkills")?;
        let accuracy = packet.read_int().field("accuracy")?;
        let health = packet.read_int().field("health")?;
        let armour = packet.read_int().field("armour")?;
        let weapon = Weapon::from(packet.read_int().field("weapon in use")?);
        let privilege = Privilege::from(packet.read_int().field("client privilege")?);
        let state = State::from(packet.read_int().field("client state")?);

        let a = packet.read_byte().field("first IP byte")?;
        let b = packet.read_byte().field("second IP byte")?;
        let c = packet.read_byte().field("third IP byte")?;

        Ok(Self {
            cn,
            ping,
            name,
            team,
            frags,
            flags,
            deaths,
            teamkills,
            accuracy,
            health,
            armour,
            weapon,
            privilege,
            state,
            ip: Ipv4Addr::new(a, b, c, 0),
        })
    }
}

/// Decode the client number list that opens a client info response
pub fn parse_client_numbers(packet: &mut Packet) -> Result<Vec<i32>, ExtinfoError> {
    expect_packet_type(packet, CLIENT_INFO_RESPONSE_CNS)?;

    let mut cns = Vec::new();
    while packet.has_remaining() {
        cns.push(packet.read_int().field("client number from client info packet")?);
    }
    Ok(cns)
}

fn expect_packet_type(packet: &mut Packet, expected: i32) -> Result<(), ExtinfoError> {
    let got = packet.read_int().field("client info packet type")?;
    if got != expected {
        return Err(ExtinfoError::UnexpectedPacketType { expected, got });
    }
    Ok(())
}
