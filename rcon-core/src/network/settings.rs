use std::fmt;
use std::time::Duration;

/// Generic Source RCON port. Conan Exiles hosts usually assign their own.
pub const DEFAULT_PORT: u16 = 25575;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Minimum spacing between two frames on the wire.
pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_millis(200);

/// Where and how to open an RCON session.
#[derive(Clone, PartialEq, Eq)]
pub struct RconSettings {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Deadline for the TCP connect.
    pub connect_timeout: Duration,
    /// Deadline for one request/response exchange.
    pub read_timeout: Duration,
    /// Connect attempts before giving up with `ConnectionExhausted`.
    pub max_retries: u32,
    /// Pause between failed connect attempts.
    pub retry_delay: Duration,
    pub command_interval: Duration,
}

impl RconSettings {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            command_interval: DEFAULT_COMMAND_INTERVAL,
        }
    }

    /// `host:port`, for logs and error messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for RconSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("command_interval", &self.command_interval)
            .finish()
    }
}
