//! # rcon-core
//!
//! Async client for the Source/Unreal-style RCON protocol, as spoken by
//! Conan Exiles dedicated servers.
//!
//! This crate contains:
//! - **Protocol types**: `FrameHeader`, `Packet`, `PacketType`
//! - **Codec**: `RconCodec` for framed TCP I/O via `tokio_util`
//! - **Network**: `ConnectionManager` owning one authenticated session, behind a `Connector` seam
//! - **State**: `ConnectionPhase`, the session state machine
//! - **Executor**: `CommandExecutor` serialising commands, with `RetryPolicy`
//! - **Players**: parsers for the server's player-list replies
//! - **Events**: `EventRegistry` and the `KillMonitor` log poller
//! - **Client**: `RconClient`, the facade the other pieces hang off
//! - **Error**: `RconError`, a typed `thiserror`-based error hierarchy

pub mod client;
pub mod codec;
pub mod error;
pub mod events;
pub mod executor;
pub mod header;
pub mod message;
pub mod network;
pub mod packet;
pub mod players;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::RconClient;
pub use codec::RconCodec;
pub use error::RconError;
pub use events::{CallbackError, EventRegistry, KillEvent, KillMonitor, LogEvent};
pub use executor::{CommandExecutor, RetryPolicy};
pub use header::{FrameHeader, HEADER_LENGTH};
pub use message::PacketType;
pub use network::{ConnectionManager, Connector, RconSettings, TcpConnector};
pub use packet::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, Packet};
pub use players::{ParseDegraded, PlayerRecord, PlayerStatus};
pub use state::ConnectionPhase;
