//! Error types for the RCON client.
//!
//! Every fallible operation returns `Result<T, RconError>`. Connection-level
//! failures are recovered inside the executor up to its retry budget; once
//! the budget is spent they surface as one summarising variant that carries
//! the last underlying error as text.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// The canonical error type for the RCON client.
#[derive(Debug, Error)]
pub enum RconError {
    // ── Framing Errors ───────────────────────────────────────────
    /// The stream ended before a frame's declared length was received.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Framing { expected: usize, actual: usize },

    /// A frame declared a length that cannot hold request id, type and terminator.
    #[error("invalid frame length: {0}")]
    InvalidLength(i32),

    /// A frame declared a length above the decoder limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An outbound payload exceeds what the server accepts in one request.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An outbound payload cannot be written as a NUL-terminated string.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A type code outside the ones this client knows.
    #[error("unknown packet type {0}")]
    UnknownPacketType(i32),

    // ── Session Errors ───────────────────────────────────────────
    /// The server answered the auth packet with request id -1.
    #[error("authentication rejected by server")]
    AuthenticationFailed,

    /// The TCP connection could not be opened.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The TCP/IO layer reported an error on an open session.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// No response arrived within the read timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// An exchange was attempted without an authenticated session.
    #[error("not connected")]
    NotConnected,

    /// A state transition was attempted from the wrong phase.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Summarising Errors ───────────────────────────────────────
    /// Every connection attempt failed.
    #[error("could not connect after {attempts} attempts: {reason}")]
    ConnectionExhausted { attempts: u32, reason: String },

    /// Every attempt to run a command failed.
    #[error("command `{command}` failed after {attempts} attempts: {reason}")]
    CommandFailed {
        command: String,
        attempts: u32,
        reason: String,
    },

    // ── Game-Level Errors ────────────────────────────────────────
    /// The player is not (or no longer) connected to the game server.
    #[error("player {0} is not connected")]
    PlayerNotConnected(String),

    /// The server did not accept the command.
    #[error("server rejected `{command}`: {response}")]
    Rejected { command: String, response: String },

    /// Another inventory-modifying operation is in progress.
    #[error("another inventory operation is in progress")]
    InventoryBusy,
}

impl RconError {
    /// Transient failures that a reconnect may cure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RconError::Framing { .. }
                | RconError::InvalidLength(_)
                | RconError::FrameTooLarge { .. }
                | RconError::ConnectFailed { .. }
                | RconError::Connection(_)
                | RconError::Timeout(_)
                | RconError::NotConnected
        )
    }

    /// The peer tore the session down (reset, broken pipe, EOF).
    ///
    /// Servers do this when they throttle a client, so these get the
    /// longer backoff.
    pub fn is_reset(&self) -> bool {
        match self {
            RconError::Connection(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    pub(crate) fn closed_by_peer() -> Self {
        RconError::Connection(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed by server",
        ))
    }
}
