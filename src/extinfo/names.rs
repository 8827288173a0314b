//! Enumerations carried in extinfo responses
//!
//! Every enumeration keeps codes it does not know as `Unknown(code)`, so a
//! newer server never makes decoding fail. JSON uses the integer wire code.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $code:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "i32", into = "i32")]
        pub enum $name {
            $($variant,)+
            Unknown(i32),
        }

        impl $name {
            /// Integer code used on the wire
            pub fn code(self) -> i32 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => code,
                }
            }

            /// Display name, `"unknown"` for unrecognized codes
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unknown(_) => "unknown",
                }
            }
        }

        impl From<i32> for $name {
            fn from(code: i32) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value.code()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

wire_enum! {
    /// Game mode of the running match
    pub enum GameMode {
        Ffa = 0 => "ffa",
        CoopEdit = 1 => "coop edit",
        Teamplay = 2 => "teamplay",
        Insta = 3 => "insta",
        InstaTeam = 4 => "insta team",
        Effic = 5 => "effic",
        EfficTeam = 6 => "effic team",
        Tactics = 7 => "tactics",
        TacticsTeam = 8 => "tactics team",
        Capture = 9 => "capture",
        RegenCapture = 10 => "regen capture",
        Ctf = 11 => "ctf",
        InstaCtf = 12 => "insta ctf",
        Protect = 13 => "protect",
        InstaProtect = 14 => "insta protect",
        Hold = 15 => "hold",
        InstaHold = 16 => "insta hold",
        EfficCtf = 17 => "effic ctf",
        EfficProtect = 18 => "effic protect",
        EfficHold = 19 => "effic hold",
        Collect = 20 => "collect",
        InstaCollect = 21 => "insta collect",
        EfficCollect = 22 => "effic collect",
    }
}

impl GameMode {
    /// Whether players are split into teams in this mode
    ///
    /// Team scores can only be queried while a team mode is running.
    pub fn is_team_mode(self) -> bool {
        !matches!(
            self,
            GameMode::Ffa
                | GameMode::CoopEdit
                | GameMode::Insta
                | GameMode::Effic
                | GameMode::Tactics
                | GameMode::Unknown(_)
        )
    }
}

wire_enum! {
    /// Who may join the server
    pub enum MasterMode {
        Auth = -1 => "auth",
        Open = 0 => "open",
        Veto = 1 => "veto",
        Locked = 2 => "locked",
        Private = 3 => "private",
        Password = 4 => "password",
    }
}

wire_enum! {
    /// Weapon a player currently holds
    pub enum Weapon {
        ChainSaw = 0 => "chain saw",
        Shotgun = 1 => "shotgun",
        ChainGun = 2 => "chain gun",
        RocketLauncher = 3 => "rocket launcher",
        Rifle = 4 => "rifle",
        GrenadeLauncher = 5 => "grenade launcher",
        Pistol = 6 => "pistol",
        FireBall = 7 => "fire ball",
        IceBall = 8 => "ice ball",
        SlimeBall = 9 => "slime ball",
        Bite = 10 => "bite",
        Barrel = 11 => "barrel",
    }
}

wire_enum! {
    pub enum Privilege {
        None = 0 => "none",
        Master = 1 => "master",
        Auth = 2 => "auth",
        Admin = 3 => "admin",
    }
}

wire_enum! {
    /// Player state
    pub enum State {
        Alive = 0 => "alive",
        Dead = 1 => "dead",
        Spawning = 2 => "spawning",
        Lagged = 3 => "lagged",
        Editing = 4 => "editing",
        Spectator = 5 => "spectator",
    }
}

wire_enum! {
    /// Server modification announced after the uptime field
    pub enum ServerMod {
        P1xbraten = -9 => "p1xbraten",
        Zeromod = -8 => "zeromod",
        Nooblounge = -7 => "nooblounge",
        Remod = -6 => "remod",
        Suckerserv = -5 => "suckerserv",
        Spaghetti = -4 => "spaghetti",
        Wahnfred = -3 => "wahnfred",
        Hopmod = -2 => "hopmod",
    }
}
