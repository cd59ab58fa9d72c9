//! RCON packet types.
//!
//! Uses a proper enum with `TryFrom`, no panics on unknown values. Only
//! request types matter for correctness; the type a server puts on its
//! replies varies between implementations and is informational.

use std::fmt;

use crate::error::RconError;

/// Type codes understood by Source/Unreal-style RCON servers.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// `SERVERDATA_RESPONSE_VALUE`: body of a command reply.
    ResponseValue = 0,
    /// `SERVERDATA_EXECCOMMAND`: run a console command.
    ///
    /// Servers reuse the same code for `SERVERDATA_AUTH_RESPONSE`.
    ExecCommand = 2,
    /// `SERVERDATA_AUTH`: log in with the RCON password.
    Auth = 3,
}

/// Code carried by auth replies (shared with [`PacketType::ExecCommand`]).
pub const AUTH_RESPONSE: i32 = PacketType::ExecCommand as i32;

/// Request id the server puts on an auth reply when the password is wrong.
pub const AUTH_FAILED_ID: i32 = -1;

impl PacketType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for PacketType {
    type Error = RconError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::ResponseValue),
            2 => Ok(PacketType::ExecCommand),
            3 => Ok(PacketType::Auth),
            _ => Err(RconError::UnknownPacketType(value)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::ResponseValue => write!(f, "ResponseValue"),
            PacketType::ExecCommand => write!(f, "ExecCommand"),
            PacketType::Auth => write!(f, "Auth"),
        }
    }
}
