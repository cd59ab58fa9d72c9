//! Serialised command execution with retry.
//!
//! The wire protocol has no multiplexing, so every command holds the
//! connection lock from `ensure_connected` until its reply has been read.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RconError;
use crate::network::{ConnectionManager, Connector, RconSettings, TcpConnector};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_COMMAND_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(5);

/// How a failed command is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends of one command, the first included.
    pub max_attempts: u32,
    /// Backoff after a timeout or framing failure.
    pub retry_delay: Duration,
    /// Backoff after the server reset the connection.
    pub reset_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_COMMAND_RETRY_DELAY,
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, error: &RconError) -> Duration {
        if error.is_reset() {
            self.reset_delay
        } else {
            self.retry_delay
        }
    }
}

/// Turns a command string into a reply string over one shared session.
///
/// A retried command is sent again verbatim. If the first send was applied
/// by the server but its reply was lost, the command runs twice: delivery is
/// at most `max_attempts` times, not exactly once.
pub struct CommandExecutor<C: Connector = TcpConnector> {
    connection: Mutex<ConnectionManager<C>>,
    policy: RetryPolicy,
}

impl CommandExecutor<TcpConnector> {
    pub fn tcp(settings: RconSettings, policy: RetryPolicy) -> Self {
        Self::new(ConnectionManager::tcp(settings), policy)
    }
}

impl<C: Connector> CommandExecutor<C> {
    pub fn new(connection: ConnectionManager<C>, policy: RetryPolicy) -> Self {
        Self {
            connection: Mutex::new(connection),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute(&self, command: &str) -> Result<String, RconError> {
        self.execute_with_attempts(command, self.policy.max_attempts)
            .await
    }

    /// Run `command`, retrying transient failures up to `max_attempts` sends.
    ///
    /// A rejected password or an unencodable command is returned as is.
    /// Transient failures reconnect and try again; once the attempts are
    /// spent the last one is reported as `CommandFailed`.
    ///
    /// The reconnect between two sends gets the full `max_retries` connect
    /// budget of the session. If that is spent the result is
    /// `ConnectionExhausted`, returned at once even when sends remain.
    pub async fn execute_with_attempts(
        &self,
        command: &str,
        max_attempts: u32,
    ) -> Result<String, RconError> {
        let max_attempts = max_attempts.max(1);
        let mut connection = self.connection.lock().await;
        connection.ensure_connected().await?;

        let mut attempt = 1;
        loop {
            match connection.exchange(command).await {
                Ok(payload) => {
                    if attempt > 1 {
                        debug!(command, attempt, "command succeeded after retry");
                    }
                    return Ok(payload);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(command, attempts = attempt, error = %e, "command failed");
                    return Err(RconError::CommandFailed {
                        command: command.to_string(),
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_for(&e);
                    warn!(
                        command,
                        attempt,
                        max_attempts,
                        error = %e,
                        ?delay,
                        "command failed; reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                    connection.reconnect().await?;
                    attempt += 1;
                }
            }
        }
    }

    /// Explicit reconnects performed by the underlying session.
    pub async fn reconnect_count(&self) -> u64 {
        self.connection.lock().await.reconnect_count()
    }

    pub async fn is_ready(&self) -> bool {
        self.connection.lock().await.is_ready()
    }

    pub async fn close(&self) {
        self.connection.lock().await.close().await;
    }
}
