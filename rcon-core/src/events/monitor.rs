use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::EventRegistry;
use super::kill::{GET_LAST_LOG, KillEvent};
use crate::client::RconClient;
use crate::error::RconError;
use crate::network::{Connector, TcpConnector};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Polls `getlastlog` and feeds new kills to an [`EventRegistry`].
pub struct KillMonitor<C: Connector = TcpConnector> {
    client: RconClient<C>,
    registry: EventRegistry<KillEvent>,
    poll_interval: Duration,
    error_backoff: Duration,
    running: Arc<AtomicBool>,
}

impl<C: Connector> KillMonitor<C> {
    pub fn new(client: RconClient<C>, registry: EventRegistry<KillEvent>) -> Self {
        Self {
            client,
            registry,
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_intervals(mut self, poll_interval: Duration, error_backoff: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.error_backoff = error_backoff;
        self
    }

    /// A cloneable stop handle. Storing `false` ends [`run`](Self::run)
    /// after the current poll, or before the first if `run` has not started.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetch the log once and dispatch what is new. Returns the new-event count.
    pub async fn poll_once(&mut self) -> Result<usize, RconError> {
        let log = self.client.execute(GET_LAST_LOG).await?;
        let events = KillEvent::parse_log(&log);
        let fresh = self.registry.dispatch_all(&events);
        if fresh > 0 {
            debug!(fresh, total = events.len(), "dispatched kill events");
        }
        Ok(fresh)
    }

    /// Poll until stopped.
    ///
    /// Transient failures back off and keep polling. A rejected password
    /// will not fix itself, so it ends the loop with an error.
    pub async fn run(&mut self) -> Result<(), RconError> {
        info!(interval = ?self.poll_interval, "kill monitor started");

        while self.running.load(Ordering::SeqCst) {
            let pause = match self.poll_once().await {
                Ok(_) => self.poll_interval,
                Err(RconError::AuthenticationFailed) => {
                    error!("kill monitor stopping: RCON authentication rejected");
                    self.running.store(false, Ordering::SeqCst);
                    return Err(RconError::AuthenticationFailed);
                }
                Err(e) => {
                    warn!(error = %e, backoff = ?self.error_backoff, "kill monitor poll failed");
                    self.error_backoff
                }
            };
            tokio::time::sleep(pause).await;
        }

        info!("kill monitor stopped");
        Ok(())
    }
}
