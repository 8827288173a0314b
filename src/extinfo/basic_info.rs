//! Basic server info

use serde::{Deserialize, Serialize};

use super::names::{GameMode, MasterMode};
use super::FieldContext;
use crate::cubecode::{sanitize, Packet};
use crate::error::ExtinfoError;

/// Game speed of servers that do not report one
pub const DEFAULT_GAME_SPEED: i32 = 100;

/// Answer to a basic info query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    /// Connected clients, players and spectators
    pub num_clients: i32,
    pub protocol_version: i32,
    pub game_mode: GameMode,
    /// Seconds until intermission
    pub secs_left: i32,
    /// Maximum number of clients
    pub num_slots: i32,
    pub master_mode: MasterMode,
    pub paused: bool,
    pub game_speed: i32,
    pub map: String,
    pub description: String,
}

impl BasicInfo {
    /// Decode the payload of a basic info response
    ///
    /// After the client count comes the number of attributes that follow:
    /// 5 on older servers, 7 when paused and game speed are included.
    pub fn parse(packet: &mut Packet) -> Result<Self, ExtinfoError> {
        let num_clients = packet.read_int().field("number of connected clients")?;
        let attributes = packet.read_int().field("number of following values")?;

        let protocol_version = packet.read_int().field("protocol version")?;
        let game_mode = GameMode::from(packet.read_int().field("game mode")?);
        let secs_left = packet.read_int().field("time left")?;
        let num_slots = packet.read_int().field("maximum number of clients")?;
        let master_mode = MasterMode::from(packet.read_int().field("master mode")?);

        let (paused, game_speed) = if attributes == 7 {
            let paused = packet.read_int().field("paused value")? == 1;
            let game_speed = packet.read_int().field("game speed")?;
            (paused, game_speed)
        } else {
            (false, DEFAULT_GAME_SPEED)
        };

        let map = sanitize(&packet.read_string().field("map name")?);
        let description = sanitize(&packet.read_string().field("server description")?);

        Ok(Self {
            num_clients,
            protocol_version,
            game_mode,
            secs_left,
            num_slots,
            master_mode,
            paused,
            game_speed,
            map,
            description,
        })
    }
}
