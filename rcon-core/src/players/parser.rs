//! Pure parsers for the three player-list shapes the server emits.
//!
//! Each parser either yields records or a [`ParseDegraded`] reason that
//! tells the caller to try the next command. None of them ever fails
//! loudly: a garbled reply degrades, it never becomes a player name.

use serde::Deserialize;
use serde_json::Value;

use super::PlayerRecord;

/// Banner some server builds print before the `GetPlayerList` JSON.
pub const GET_PLAYER_LIST_BANNER: &str = "Command 'GetPlayerList' succeeded!";

/// Fragments of the server's "unknown command" reply.
const COMMAND_NOT_FOUND_MARKERS: [&str; 2] = ["Couldn't find the command", "Try \"help\""];

const HEADER_TOKENS: [&str; 3] = ["Idx", "Char name", "Player name"];

const NO_PLAYERS: &str = "No players";

/// Why a reply produced no usable players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDegraded {
    /// The server did not know the command and said so in the payload.
    CommandNotFound,
    /// Nothing that looks like a player.
    Empty,
    /// `GetPlayerList` did not return a usable JSON document.
    InvalidJson,
}

pub type ParseResult = Result<Vec<PlayerRecord>, ParseDegraded>;

#[derive(Debug, Deserialize)]
struct PlayerListDocument {
    players: Vec<JsonPlayer>,
}

#[derive(Debug, Deserialize)]
struct JsonPlayer {
    #[serde(rename = "charName", default)]
    char_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "playerId", default)]
    player_id: Option<Value>,
}

impl JsonPlayer {
    fn into_record(self) -> Option<PlayerRecord> {
        let name = [self.char_name, self.name]
            .into_iter()
            .flatten()
            .map(|n| n.trim().to_string())
            .find(|n| !n.is_empty())?;
        let platform_id = match self.player_id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Some(PlayerRecord {
            character_name: name,
            connection_index: None,
            platform_id,
        })
    }
}

/// `true` when the text is the server's command-not-found reply.
pub fn is_command_not_found(text: &str) -> bool {
    COMMAND_NOT_FOUND_MARKERS.iter().any(|m| text.contains(m))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn finish(records: Vec<PlayerRecord>) -> ParseResult {
    if records
        .iter()
        .any(|r| is_command_not_found(&r.character_name))
    {
        return Err(ParseDegraded::CommandNotFound);
    }
    if records.is_empty() {
        return Err(ParseDegraded::Empty);
    }
    Ok(records)
}

/// Lines of a `ListPlayers` reply with the header line removed.
fn body_lines(raw: &str) -> impl Iterator<Item = &str> {
    let mut lines = raw.lines().peekable();
    if lines
        .peek()
        .is_some_and(|first| HEADER_TOKENS.iter().any(|t| first.contains(t)))
    {
        lines.next();
    }
    lines.filter(|l| !l.trim().is_empty())
}

/// Parse a `GetPlayerList` reply: `{"players": [{"charName", "name", "playerId"}]}`.
///
/// `charName` wins over `name`; entries with neither are skipped.
pub fn parse_player_list_json(raw: &str) -> ParseResult {
    if is_command_not_found(raw) {
        return Err(ParseDegraded::CommandNotFound);
    }
    let text = raw.trim();
    let text = text.strip_prefix(GET_PLAYER_LIST_BANNER).unwrap_or(text);
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ParseDegraded::InvalidJson);
    };
    if end < start {
        return Err(ParseDegraded::InvalidJson);
    }

    let document: PlayerListDocument =
        serde_json::from_str(&text[start..=end]).map_err(|_| ParseDegraded::InvalidJson)?;
    finish(
        document
            .players
            .into_iter()
            .filter_map(JsonPlayer::into_record)
            .collect(),
    )
}

/// Parse a `ListPlayers` reply.
///
/// Pipe tables (`Idx | Char name | Player name | User ID | Platform ID`) and
/// whitespace tables (`Idx Name Something...`) are both accepted. A reply
/// saying there are no players is a definite, empty answer.
pub fn parse_list_players(raw: &str) -> ParseResult {
    if is_command_not_found(raw) {
        return Err(ParseDegraded::CommandNotFound);
    }
    if raw.contains(NO_PLAYERS) {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for line in body_lines(raw) {
        if line.contains('|') {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            let name = parts.get(1).copied().unwrap_or_default();
            if name.is_empty() || name == "Char name" {
                continue;
            }
            records.push(PlayerRecord {
                character_name: name.to_string(),
                connection_index: Some(parts[0].to_string()).filter(|s| !s.is_empty()),
                platform_id: parts
                    .get(4)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string()),
            });
        } else {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 {
                continue;
            }
            let name = tokens[1];
            if name == "Steam" || is_numeric(name) {
                continue;
            }
            records.push(PlayerRecord {
                character_name: name.to_string(),
                connection_index: Some(tokens[0].to_string()),
                platform_id: None,
            });
        }
    }
    finish(records)
}

/// Parse a `ListPlayerIDs` reply: `<id> <id> <name with spaces>`.
pub fn parse_list_player_ids(raw: &str) -> ParseResult {
    if is_command_not_found(raw) {
        return Err(ParseDegraded::CommandNotFound);
    }

    let records = raw
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 {
                return None;
            }
            let name = tokens[2..].join(" ");
            if is_numeric(&name) {
                return None;
            }
            Some(PlayerRecord {
                character_name: name,
                connection_index: None,
                platform_id: None,
            })
        })
        .collect();
    finish(records)
}

/// Find the connection index of the `ListPlayers` row carrying `platform_id`.
///
/// The id must equal one of the row's columns exactly; the index is the
/// first column.
pub fn find_connection_index(raw: &str, platform_id: &str) -> Option<String> {
    let platform_id = platform_id.trim();
    if platform_id.is_empty() {
        return None;
    }
    body_lines(raw).find_map(|line| {
        let mut columns = line.split('|').map(str::trim);
        let index = columns.next()?;
        if index.is_empty() || !columns.any(|c| c == platform_id) {
            return None;
        }
        Some(index.to_string())
    })
}
