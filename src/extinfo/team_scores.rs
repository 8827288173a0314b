//! Team scores

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::names::GameMode;
use super::FieldContext;
use crate::cubecode::Packet;
use crate::error::ExtinfoError;

/// Score of one team
///
/// The score is flags in ctf modes, frags in deathmatch, points in capture and
/// skulls in collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub name: String,
    pub score: i32,
    /// Bases held by the team (capture modes only)
    pub bases: Vec<i32>,
}

/// Answer to a team scores query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub game_mode: GameMode,
    pub secs_left: i32,
    /// Scores keyed by team name
    pub scores: BTreeMap<String, TeamScore>,
}

impl TeamScores {
    pub fn parse(packet: &mut Packet) -> Result<Self, ExtinfoError> {
        let game_mode = GameMode::from(packet.read_int().field("game mode")?);
        let secs_left = packet.read_int().field("time left")?;

        let mut scores = BTreeMap::new();
        while packet.has_remaining() {
            let name = packet.read_string().field("team name")?;
            let score = packet.read_int().field("team score")?;
            let num_bases = packet.read_int().field("number of bases")?.max(0);

            let mut bases = Vec::with_capacity(num_bases.min(64) as usize);
            for _ in 0..num_bases {
                bases.push(packet.read_int().field("base")?);
            }

            scores.insert(name.clone(), TeamScore { name, score, bases });
        }

        Ok(Self {
            game_mode,
            secs_left,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubecode::PacketWriter;
    use crate::error::CodecError;

    #[test]
    fn test_parse_teams() {
        let mut w = PacketWriter::new();
        w.write_int(9)
            .write_int(300)
            .write_string("good")
            .write_int(512)
            .write_int(2)
            .write_int(3)
            .write_int(5)
            .write_string("evil")
            .write_int(-4)
            .write_int(-1);
        let teams = TeamScores::parse(&mut Packet::new(w.finish())).unwrap();

        assert_eq!(teams.game_mode, GameMode::Capture);
        assert_eq!(teams.secs_left, 300);
        assert_eq!(teams.scores.len(), 2);

        let good = &teams.scores["good"];
        assert_eq!(good.score, 512);
        assert_eq!(good.bases, vec![3, 5]);

        let evil = &teams.scores["evil"];
        assert_eq!(evil.score, -4);
        assert!(evil.bases.is_empty());
    }

    #[test]
    fn test_no_teams() {
        let mut w = PacketWriter::new();
        w.write_int(11).write_int(0);
        let teams = TeamScores::parse(&mut Packet::new(w.finish())).unwrap();

        assert!(teams.scores.is_empty());
    }

    #[test]
    fn test_missing_base() {
        let mut w = PacketWriter::new();
        w.write_int(9)
            .write_int(10)
            .write_string("good")
            .write_int(1)
            .write_int(2)
            .write_int(7);
        let err = TeamScores::parse(&mut Packet::new(w.finish())).unwrap_err();

        assert_eq!(
            err,
            ExtinfoError::Field {
                field: "base",
                source: CodecError::BufferTooShort,
            }
        );
    }

    #[test]
    fn test_json_shape() {
        let mut w = PacketWriter::new();
        w.write_int(11)
            .write_int(60)
            .write_string("good")
            .write_int(3)
            .write_int(0);
        let teams = TeamScores::parse(&mut Packet::new(w.finish())).unwrap();
        let json = serde_json::to_value(&teams.scores).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "good": { "name": "good", "score": 3, "bases": [] } })
        );
    }
}
