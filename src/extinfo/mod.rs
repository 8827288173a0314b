//! Typed queries of the game server's extinfo protocol
//!
//! A request is a handful of bytes: the info type, for extended queries a
//! subtype, and for client info a client number. Every response starts with
//! the request echoed back verbatim. Extended responses continue with an ACK
//! byte, the protocol version, and (except for uptime) an error flag:
//!
//! ```text
//! basic:     [1] | payload
//! uptime:    [0, 0] | ACK VERSION | uptime [mod]
//! extended:  [0, type, ...] | ACK VERSION ERR | payload
//! ```
//!
//! [`Server`] issues the queries through a shared [`Pinger`](crate::pinger::Pinger).

pub mod basic_info;
pub mod client_info;
pub mod names;
pub mod server;
pub mod team_scores;

pub use basic_info::BasicInfo;
pub use client_info::ClientInfo;
pub use names::{GameMode, MasterMode, Privilege, ServerMod, State, Weapon};
pub use server::Server;
pub use team_scores::{TeamScore, TeamScores};

use bytes::{Buf, Bytes};

use crate::cubecode::Packet;
use crate::error::{CodecError, ExtinfoError};

/// Extended query
pub const INFO_TYPE_EXTENDED: u8 = 0;
/// Basic query
pub const INFO_TYPE_BASIC: u8 = 1;

pub const EXT_ACK: u8 = 255;
/// The only supported protocol version
pub const EXT_VERSION: u8 = 105;
pub const EXT_ERROR: u8 = 1;

pub const EXT_UPTIME: u8 = 0;
pub const EXT_CLIENT_INFO: u8 = 1;
pub const EXT_TEAM_SCORES: u8 = 2;

/// First client info packet: list of client numbers
pub const CLIENT_INFO_RESPONSE_CNS: i32 = -10;
/// Following client info packets: stats of one client
pub const CLIENT_INFO_RESPONSE_STATS: i32 = -11;

/// Client number requesting every connected client
pub const ALL_CLIENTS: i32 = -1;

/// Validate the response envelope and return the payload
pub fn parse_response(request: &[u8], mut response: Bytes) -> Result<Packet, ExtinfoError> {
    if request.is_empty() || response.len() < request.len() + 3 {
        return Err(ExtinfoError::ResponseTooShort);
    }
    if !response.starts_with(request) {
        return Err(ExtinfoError::EchoMismatch);
    }

    let info_type = request[0];
    response.advance(request.len());

    if info_type == INFO_TYPE_BASIC {
        return Ok(Packet::new(response));
    }

    let command = request.get(1).copied();

    if response[0] != EXT_ACK {
        return Err(ExtinfoError::InvalidAck(response[0]));
    }
    if response[1] != EXT_VERSION {
        return Err(ExtinfoError::WrongVersion(response[1]));
    }

    if command == Some(EXT_UPTIME) {
        return Ok(Packet::new(response.split_off(2)));
    }

    if response[2] == EXT_ERROR {
        match command {
            Some(EXT_CLIENT_INFO) => {
                let cn = request.get(2).map_or(ALL_CLIENTS, |&b| b as i8 as i32);
                return Err(ExtinfoError::NoSuchClient(cn));
            }
            Some(EXT_TEAM_SCORES) => return Err(ExtinfoError::NotTeamMode),
            _ => {}
        }
    }

    Ok(Packet::new(response.split_off(3)))
}

/// Attach the name of the field being decoded to a codec error
pub(crate) trait FieldContext<T> {
    fn field(self, name: &'static str) -> Result<T, ExtinfoError>;
}

impl<T> FieldContext<T> for Result<T, CodecError> {
    fn field(self, name: &'static str) -> Result<T, ExtinfoError> {
        self.map_err(|source| ExtinfoError::Field {
            field: name,
            source,
        })
    }
}
