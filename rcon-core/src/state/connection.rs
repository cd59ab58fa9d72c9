//! Connection state machine for one RCON session.
//!
//! Provides a `ConnectionPhase` enum that models the lifecycle of the
//! session, with validated transitions that return `Result` instead of
//! panicking.

use std::time::Instant;

use crate::error::RconError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of an RCON session.
///
/// ```text
///  Disconnected ──► Connecting ──► Authenticating ──► Ready
///       ▲                │                │             │
///       └────────────────┴────────────────┴─────────────┘
///                   (I/O error, auth failure, close)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No socket. Initial / terminal state.
    #[default]
    Disconnected,

    /// TCP connect in progress.
    Connecting,

    /// Socket open; auth packet sent, waiting for the reply.
    Authenticating,

    /// Authenticated; commands may be sent.
    Ready {
        /// When the session became ready.
        since: Instant,
    },
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Ready { .. } => write!(f, "Ready"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the session has been ready. `None` for any other phase.
    pub fn ready_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Ready { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), RconError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(RconError::ProtocolViolation(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Valid from: `Connecting`.
    pub fn begin_auth(&mut self) -> Result<(), RconError> {
        match self {
            Self::Connecting => {
                *self = Self::Authenticating;
                Ok(())
            }
            _ => Err(RconError::ProtocolViolation(
                "cannot authenticate: not in Connecting state",
            )),
        }
    }

    /// Valid from: `Authenticating`.
    pub fn complete_auth(&mut self) -> Result<(), RconError> {
        match self {
            Self::Authenticating => {
                *self = Self::Ready {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(RconError::ProtocolViolation(
                "cannot complete auth: not in Authenticating state",
            )),
        }
    }

    /// Reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
