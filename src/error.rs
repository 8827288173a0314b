//! Error types
//!
//! Each subsystem has its own error enum. They all convert into [`Error`],
//! which is what the public async APIs return.

use std::fmt;

use crate::broker::BrokerError;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or stream I/O failure
    Io(std::io::Error),
    /// Packet decoding failure
    Codec(CodecError),
    /// Extinfo protocol violation or semantic error reported by the server
    Extinfo(ExtinfoError),
    /// UDP pinger failure
    Pinger(PingerError),
    /// Broker bookkeeping failure
    Broker(BrokerError),
    /// Master server failure
    Master(MasterError),
    /// Snapshot (de)serialization failure
    Json(serde_json::Error),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Codec(e) => write!(f, "{}", e),
            Error::Extinfo(e) => write!(f, "{}", e),
            Error::Pinger(e) => write!(f, "{}", e),
            Error::Broker(e) => write!(f, "{}", e),
            Error::Master(e) => write!(f, "{}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Codec(e) => Some(e),
            Error::Extinfo(e) => Some(e),
            Error::Pinger(e) => Some(e),
            Error::Broker(e) => Some(e),
            Error::Master(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<ExtinfoError> for Error {
    fn from(e: ExtinfoError) -> Self {
        Error::Extinfo(e)
    }
}

impl From<PingerError> for Error {
    fn from(e: PingerError) -> Self {
        Error::Pinger(e)
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Error::Broker(e)
    }
}

impl From<MasterError> for Error {
    fn from(e: MasterError) -> Self {
        Error::Master(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

/// Cube packet codec errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes remain than the read requires. Nothing was consumed.
    BufferTooShort,
    /// A sub-packet longer than the remaining bytes was requested
    SubPacketTooLong { requested: usize, remaining: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BufferTooShort => write!(f, "cubecode: buffer too short"),
            CodecError::SubPacketTooLong {
                requested,
                remaining,
            } => write!(
                f,
                "cubecode: sub-packet of length {} requested, but there are only {} bytes left",
                requested, remaining
            ),
        }
    }
}

impl std::error::Error for CodecError {}

/// Extinfo protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtinfoError {
    /// Response shorter than the echoed request plus the fixed header
    ResponseTooShort,
    /// Response does not start with the request bytes
    EchoMismatch,
    /// ACK byte was not 255
    InvalidAck(u8),
    /// Protocol version byte was not the supported one
    WrongVersion(u8),
    /// Server reported that the requested client does not exist
    NoSuchClient(i32),
    /// Server reported that it is not running a team mode
    NotTeamMode,
    /// A client info packet carried the wrong type tag
    UnexpectedPacketType { expected: i32, got: i32 },
    /// A field could not be decoded
    Field {
        field: &'static str,
        source: CodecError,
    },
    /// No (or not enough) response packets before the deadline
    Timeout { addr: String },
}

impl ExtinfoError {
    /// Whether the server itself reported the failure (error flag set)
    pub fn is_semantic(&self) -> bool {
        matches!(self, ExtinfoError::NoSuchClient(_) | ExtinfoError::NotTeamMode)
    }
}

impl fmt::Display for ExtinfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtinfoError::ResponseTooShort => write!(f, "extinfo: invalid response: too short"),
            ExtinfoError::EchoMismatch => {
                write!(f, "extinfo: invalid response: response does not match request")
            }
            ExtinfoError::InvalidAck(ack) => {
                write!(f, "extinfo: invalid response: expected 255 (ACK), got {}", ack)
            }
            ExtinfoError::WrongVersion(v) => {
                write!(f, "extinfo: wrong version: expected 105, got {}", v)
            }
            ExtinfoError::NoSuchClient(cn) => write!(f, "extinfo: no client with cn {}", cn),
            ExtinfoError::NotTeamMode => write!(f, "extinfo: server is not running a team mode"),
            ExtinfoError::UnexpectedPacketType { expected, got } => write!(
                f,
                "extinfo: parsing client info packet: expected type {}, but got {}",
                expected, got
            ),
            ExtinfoError::Field { field, source } => {
                write!(f, "extinfo: reading {}: {}", field, source)
            }
            ExtinfoError::Timeout { addr } => {
                write!(f, "extinfo: receiving response from {} timed out", addr)
            }
        }
    }
}

impl std::error::Error for ExtinfoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtinfoError::Field { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// UDP pinger errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingerError {
    /// Host name did not resolve to an IPv4 address
    Resolve { addr: String, reason: String },
    /// The pinger's dispatch loop is gone
    Closed,
}

impl fmt::Display for PingerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingerError::Resolve { addr, reason } => write!(f, "resolving {}: {}", addr, reason),
            PingerError::Closed => write!(f, "pinger is closed"),
        }
    }
}

impl std::error::Error for PingerError {}

/// Master server errors
#[derive(Debug)]
pub enum MasterError {
    /// Connecting to the master server timed out
    DialTimeout(String),
    /// Reading the list did not finish in time
    ReadTimeout(String),
    /// Connection failed
    Io(std::io::Error),
}

impl fmt::Display for MasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterError::DialTimeout(addr) => write!(f, "master: dialing {} timed out", addr),
            MasterError::ReadTimeout(addr) => {
                write!(f, "master: reading server list from {} timed out", addr)
            }
            MasterError::Io(e) => write!(f, "master: {}", e),
        }
    }
}

impl std::error::Error for MasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MasterError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MasterError {
    fn from(e: std::io::Error) -> Self {
        MasterError::Io(e)
    }
}
