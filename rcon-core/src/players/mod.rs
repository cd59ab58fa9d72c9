//! Online-player queries.
//!
//! The server has no stable schema for "who is online", so the query walks
//! three commands from most to least structured and keeps the first answer
//! that parses.

pub mod parser;

use std::fmt;

use tracing::{debug, error, info};

use crate::error::RconError;
use crate::executor::CommandExecutor;
use crate::network::Connector;

pub use parser::{ParseDegraded, ParseResult};

pub const GET_PLAYER_LIST: &str = "GetPlayerList";
pub const LIST_PLAYERS: &str = "ListPlayers";
pub const LIST_PLAYER_IDS: &str = "ListPlayerIDs";

/// One online player, as reported by a single poll.
///
/// `connection_index` is only valid for the player's current game session.
/// Resolve it again before every targeted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub character_name: String,
    pub connection_index: Option<String>,
    pub platform_id: Option<String>,
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.character_name)?;
        if let Some(idx) = &self.connection_index {
            write!(f, " (idx {idx})")?;
        }
        if let Some(id) = &self.platform_id {
            write!(f, " [{id}]")?;
        }
        Ok(())
    }
}

/// Whether a player is in game, as far as the server can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Online,
    Offline,
    /// The lookup failed. Treat as "cannot verify", never as offline.
    Unknown,
}

type Parser = fn(&str) -> ParseResult;

const QUERY_ORDER: [(&str, Parser); 3] = [
    (GET_PLAYER_LIST, parser::parse_player_list_json),
    (LIST_PLAYERS, parser::parse_list_players),
    (LIST_PLAYER_IDS, parser::parse_list_player_ids),
];

/// Every player currently online, in server order.
///
/// Never fails: a lost connection or three unusable replies both give an
/// empty list, with the cause logged.
pub async fn fetch_online_players<C: Connector>(executor: &CommandExecutor<C>) -> Vec<PlayerRecord> {
    for (command, parse) in QUERY_ORDER {
        let raw = match executor.execute(command).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(command, error = %e, "player list query failed");
                return Vec::new();
            }
        };
        match parse(&raw) {
            Ok(players) => {
                info!(command, count = players.len(), "online players");
                return players;
            }
            Err(reason) => debug!(command, ?reason, "player list reply unusable; trying next command"),
        }
    }
    Vec::new()
}

/// Current connection index of `platform_id`, read from a fresh `ListPlayers`.
pub async fn resolve_connection_index<C: Connector>(
    executor: &CommandExecutor<C>,
    platform_id: &str,
) -> Result<Option<String>, RconError> {
    let raw = executor.execute(LIST_PLAYERS).await?;
    let index = parser::find_connection_index(&raw, platform_id);
    debug!(platform_id, index = ?index, "resolved connection index");
    Ok(index)
}
