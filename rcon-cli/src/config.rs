//! Configuration for the RCON command-line client.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rcon_core::{RconSettings, RetryPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Game server endpoint and credentials.
    pub server: ServerConfig,
    /// Timeouts and retry budgets.
    pub connection: ConnectionConfig,
    /// Kill feed polling.
    pub monitor: MonitorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// RCON port (not the game port).
    pub port: u16,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub connect_timeout_secs: u64,
    /// Deadline for one command round trip.
    pub read_timeout_secs: u64,
    /// Connect attempts before giving up.
    pub max_retries: u32,
    /// Pause between connect attempts.
    pub retry_delay_secs: u64,
    /// Minimum spacing between commands, in milliseconds.
    pub command_interval_ms: u64,
    /// Sends of one command before it is reported as failed.
    pub max_attempts: u32,
    pub command_retry_delay_secs: u64,
    /// Backoff after the server reset the connection.
    pub reset_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no RCON host configured (set [server].host or RCON_HOST)")]
    MissingHost,

    #[error("no RCON password configured (set [server].password or RCON_PASSWORD)")]
    MissingPassword,
}

/// Something that happened while loading, kept until logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNotice {
    /// No file at the path; defaults were used.
    Missing(PathBuf),
    /// The file did not parse; defaults were used.
    Invalid { path: PathBuf, reason: String },
    /// An environment override was not a valid number.
    IgnoredEnv { key: String, value: String },
}

impl ConfigNotice {
    /// Whether this deserves a warning rather than an info line.
    pub fn is_warning(&self) -> bool {
        !matches!(self, ConfigNotice::Missing(_))
    }
}

impl fmt::Display for ConfigNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigNotice::Missing(path) => {
                write!(f, "no config at {}; using defaults", path.display())
            }
            ConfigNotice::Invalid { path, reason } => {
                write!(f, "invalid config {}: {reason}; using defaults", path.display())
            }
            ConfigNotice::IgnoredEnv { key, value } => {
                write!(f, "ignoring {key}={value:?}: not a valid number")
            }
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            connection: ConnectionConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: rcon_core::network::settings::DEFAULT_PORT,
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
            max_retries: 3,
            retry_delay_secs: 5,
            command_interval_ms: 200,
            max_attempts: 3,
            command_retry_delay_secs: 1,
            reset_delay_secs: 5,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            error_backoff_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

fn parse_env<T: FromStr>(key: &str, value: &str, notices: &mut Vec<ConfigNotice>) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            notices.push(ConfigNotice::IgnoredEnv {
                key: key.to_string(),
                value: value.to_string(),
            });
            None
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// A fallback comes with a notice for the caller to log.
    pub fn load(path: &Path) -> (Self, Option<ConfigNotice>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, None),
                Err(e) => (
                    Self::default(),
                    Some(ConfigNotice::Invalid {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }),
                ),
            },
            Err(_) => (Self::default(), Some(ConfigNotice::Missing(path.to_path_buf()))),
        }
    }

    /// Override settings from the process environment.
    pub fn apply_env(&mut self) -> Vec<ConfigNotice> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override settings from `lookup`. Malformed numbers are skipped and
    /// reported.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Vec<ConfigNotice>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut notices = Vec::new();
        let n = &mut notices;
        if let Some(host) = lookup("RCON_HOST").or_else(|| lookup("GAME_SERVER_HOST")) {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = lookup("RCON_PORT").and_then(|v| parse_env("RCON_PORT", &v, n)) {
            self.server.port = port;
        }
        if let Some(password) = lookup("RCON_PASSWORD") {
            self.server.password = password;
        }
        if let Some(secs) =
            lookup("RCON_CONNECT_TIMEOUT").and_then(|v| parse_env("RCON_CONNECT_TIMEOUT", &v, n))
        {
            self.connection.connect_timeout_secs = secs;
        }
        if let Some(n) = lookup("RCON_MAX_RETRIES").and_then(|v| parse_env("RCON_MAX_RETRIES", &v, n))
        {
            self.connection.max_retries = n;
        }
        if let Some(secs) =
            lookup("RCON_RETRY_DELAY").and_then(|v| parse_env("RCON_RETRY_DELAY", &v, n))
        {
            self.connection.retry_delay_secs = secs;
        }
        notices
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.server.password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        Ok(())
    }

    /// Convert the server and connection sections into `RconSettings`.
    pub fn to_settings(&self) -> RconSettings {
        let c = &self.connection;
        let mut settings = RconSettings::new(
            self.server.host.trim(),
            self.server.port,
            self.server.password.clone(),
        );
        settings.connect_timeout = Duration::from_secs(c.connect_timeout_secs.max(1));
        settings.read_timeout = Duration::from_secs(c.read_timeout_secs.max(1));
        settings.max_retries = c.max_retries.max(1);
        settings.retry_delay = Duration::from_secs(c.retry_delay_secs);
        settings.command_interval = Duration::from_millis(c.command_interval_ms);
        settings
    }

    pub fn to_policy(&self) -> RetryPolicy {
        let c = &self.connection;
        RetryPolicy {
            max_attempts: c.max_attempts.max(1),
            retry_delay: Duration::from_secs(c.command_retry_delay_secs),
            reset_delay: Duration::from_secs(c.reset_delay_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs.max(1))
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.monitor.error_backoff_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&CliConfig::default()).unwrap();
        assert!(text.contains("[server]"));
        assert!(text.contains("max_retries"));
        assert!(text.contains("poll_interval_secs"));
    }

    #[test]
    fn generated_default_loads_back() {
        let path = std::env::temp_dir().join(format!("rcon-cli-{}.toml", std::process::id()));
        std::fs::write(&path, toml::to_string_pretty(&CliConfig::default()).unwrap()).unwrap();
        let (cfg, notice) = CliConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(notice, None);
        assert_eq!(cfg.server.port, 25575);
        assert_eq!(cfg.connection.command_interval_ms, 200);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = Path::new("/nonexistent/rcon-cli.toml");
        let (cfg, notice) = CliConfig::load(path);
        assert_eq!(cfg.monitor.poll_interval_secs, 2);
        let notice = notice.unwrap();
        assert_eq!(notice, ConfigNotice::Missing(path.to_path_buf()));
        assert!(!notice.is_warning());
    }

    #[test]
    fn unparsable_file_is_reported() {
        let path = std::env::temp_dir().join(format!("rcon-cli-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[server\nport = ").unwrap();
        let (cfg, notice) = CliConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.server.port, 25575);
        assert!(matches!(notice, Some(ConfigNotice::Invalid { .. })));
        assert!(notice.unwrap().is_warning());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: CliConfig = toml::from_str(
            "[server]\nhost = \"10.0.0.5\"\nport = 28316\npassword = \"pw\"\n",
        )
        .unwrap();
        assert_eq!(cfg.server.port, 28316);
        assert_eq!(cfg.connection.connect_timeout_secs, 10);
        assert_eq!(cfg.connection.retry_delay_secs, 5);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg = CliConfig::default();
        cfg.apply_env_from(env(&[
            ("GAME_SERVER_HOST", "conan.example.net"),
            ("RCON_PORT", "28316"),
            ("RCON_PASSWORD", "hunter2"),
            ("RCON_MAX_RETRIES", "5"),
            ("RCON_RETRY_DELAY", "2"),
            ("RCON_CONNECT_TIMEOUT", "15"),
        ]));

        let settings = cfg.to_settings();
        assert_eq!(settings.addr(), "conan.example.net:28316");
        assert_eq!(settings.password, "hunter2");
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.retry_delay, Duration::from_secs(2));
        assert_eq!(settings.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn rcon_host_wins_over_game_server_host() {
        let mut cfg = CliConfig::default();
        cfg.apply_env_from(env(&[("GAME_SERVER_HOST", "a"), ("RCON_HOST", "b")]));
        assert_eq!(cfg.server.host, "b");
    }

    #[test]
    fn malformed_numbers_are_ignored() {
        let mut cfg = CliConfig::default();
        let notices =
            cfg.apply_env_from(env(&[("RCON_PORT", "not-a-port"), ("RCON_MAX_RETRIES", "-1")]));
        assert_eq!(cfg.server.port, 25575);
        assert_eq!(cfg.connection.max_retries, 3);

        let keys: Vec<_> = notices
            .iter()
            .map(|n| match n {
                ConfigNotice::IgnoredEnv { key, .. } => key.as_str(),
                other => panic!("unexpected notice {other:?}"),
            })
            .collect();
        assert_eq!(keys, ["RCON_PORT", "RCON_MAX_RETRIES"]);
        assert!(notices[0].to_string().contains("not-a-port"));
    }

    #[test]
    fn validation() {
        let mut cfg = CliConfig::default();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingPassword));
        cfg.server.password = "pw".into();
        assert_eq!(cfg.validate(), Ok(()));
        cfg.server.host = "  ".into();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingHost));
    }

    #[test]
    fn policy_from_connection_section() {
        let policy = CliConfig::default().to_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
        assert_eq!(policy.reset_delay, Duration::from_secs(5));
    }

    #[test]
    fn debug_redacts_password() {
        let mut cfg = CliConfig::default();
        cfg.server.password = "hunter2".into();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
