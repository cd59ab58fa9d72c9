use super::LogEvent;

/// Command returning the server's most recent log lines.
pub const GET_LAST_LOG: &str = "getlastlog";

/// One kill line out of the server log.
///
/// Timestamps are kept as text. The server writes them as
/// `YYYY.MM.DD-HH.MM.SS:mmm`, which orders correctly as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillEvent {
    pub timestamp: String,
    pub killer: String,
    pub victim: String,
}

impl LogEvent for KillEvent {
    type Timestamp = String;

    fn timestamp(&self) -> &String {
        &self.timestamp
    }
}

impl KillEvent {
    /// Parse one log line. `None` unless it is a kill.
    ///
    /// Accepts `[<timestamp>] <killer> killed <victim>` and
    /// `<date> <time> <killer> Killed <victim>`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.contains("Killed") && !line.contains("killed") {
            return None;
        }

        let (timestamp, rest) = match line.strip_prefix('[') {
            Some(bracketed) => {
                let (ts, rest) = bracketed.split_once(']')?;
                (ts.trim().to_string(), rest)
            }
            None => {
                let mut parts = line.splitn(3, char::is_whitespace);
                let date = parts.next()?;
                let time = parts.next()?;
                (format!("{date} {time}"), parts.next().unwrap_or_default())
            }
        };
        if timestamp.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let at = tokens
            .iter()
            .position(|t| *t == "Killed" || *t == "killed")?;
        let killer = tokens.get(at.checked_sub(1)?)?;
        let victim = tokens.get(at + 1)?;

        Some(Self {
            timestamp,
            killer: killer.to_string(),
            victim: victim.to_string(),
        })
    }

    /// Every kill in a `getlastlog` payload, in log order.
    pub fn parse_log(log: &str) -> Vec<Self> {
        log.lines().filter_map(Self::parse).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_timestamp() {
        let event = KillEvent::parse("[2026.10.14-12.00.01:123] Conan killed Thrall").unwrap();
        assert_eq!(event.timestamp, "2026.10.14-12.00.01:123");
        assert_eq!(event.killer, "Conan");
        assert_eq!(event.victim, "Thrall");
    }

    #[test]
    fn two_token_timestamp() {
        let event = KillEvent::parse("2026.10.14 12:00:05 Valeria Killed Bêlit").unwrap();
        assert_eq!(event.timestamp, "2026.10.14 12:00:05");
        assert_eq!(event.killer, "Valeria");
        assert_eq!(event.victim, "Bêlit");
    }

    #[test]
    fn non_kill_and_incomplete_lines_are_skipped() {
        assert!(KillEvent::parse("[2026.10.14-12.00.01:123] Conan joined").is_none());
        assert!(KillEvent::parse("[2026.10.14-12.00.01:123] killed Thrall").is_none());
        assert!(KillEvent::parse("[2026.10.14-12.00.01:123] Conan killed").is_none());
        assert!(KillEvent::parse("killed").is_none());
    }

    #[test]
    fn parse_log_keeps_order() {
        let log = "[2026.10.14-12.00.01:000] A killed B\n\
                   [2026.10.14-12.00.02:000] Server saved\n\
                   [2026.10.14-12.00.03:000] C killed D\n";
        let events = KillEvent::parse_log(log);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].killer, "C");
        assert!(events[0].timestamp < events[1].timestamp);
    }
}
