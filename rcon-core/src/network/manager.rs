//! Ownership of the one socket behind an RCON session.
//!
//! `ConnectionManager` opens the stream, authenticates, and runs one
//! request/response exchange at a time over a `Framed` codec. It is not
//! synchronised itself: [`CommandExecutor`](crate::executor::CommandExecutor)
//! wraps it in a mutex.

use std::fmt;
use std::io;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::RconCodec;
use crate::error::RconError;
use crate::message::{AUTH_FAILED_ID, PacketType};
use crate::network::connector::{Connector, TcpConnector};
use crate::network::settings::RconSettings;
use crate::packet::Packet;
use crate::state::ConnectionPhase;

/// Request id used for the auth packet of every new session.
pub const AUTH_REQUEST_ID: i32 = 1;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to wait for the real auth reply after an empty RESPONSE_VALUE.
const AUTH_FOLLOWUP_WINDOW: Duration = Duration::from_millis(500);

fn is_source_preamble(reply: &Packet) -> bool {
    reply.kind() == PacketType::ResponseValue.code() && reply.payload().is_empty()
}

pub struct ConnectionManager<C: Connector = TcpConnector> {
    connector: C,
    settings: RconSettings,
    phase: ConnectionPhase,
    framed: Option<Framed<C::Stream, RconCodec>>,
    next_request_id: i32,
    /// Set while a request is written but its reply not yet read. Still set
    /// on entry means the previous caller was cancelled mid-exchange and the
    /// next frame on the socket belongs to nobody.
    in_flight: bool,
    last_sent: Option<Instant>,
    reconnects: u64,
}

impl ConnectionManager<TcpConnector> {
    pub fn tcp(settings: RconSettings) -> Self {
        Self::new(TcpConnector, settings)
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, settings: RconSettings) -> Self {
        Self {
            connector,
            settings,
            phase: ConnectionPhase::default(),
            framed: None,
            next_request_id: AUTH_REQUEST_ID,
            in_flight: false,
            last_sent: None,
            reconnects: 0,
        }
    }

    pub fn settings(&self) -> &RconSettings {
        &self.settings
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase.is_ready() && self.framed.is_some()
    }

    /// Explicit reconnects performed since construction.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the socket and authenticate. One attempt, no retries.
    ///
    /// Any existing session is closed first.
    pub async fn connect(&mut self) -> Result<(), RconError> {
        self.close().await;
        self.phase.begin_connect()?;

        let addr = self.settings.addr();
        info!(%addr, "connecting to RCON server");

        let connect_timeout = self.settings.connect_timeout;
        let connecting = self.connector.connect(&self.settings.host, self.settings.port);
        let stream = match tokio::time::timeout(connect_timeout, connecting).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                self.phase.force_disconnect();
                return Err(RconError::ConnectFailed { addr, source });
            }
            Err(_) => {
                self.phase.force_disconnect();
                return Err(RconError::ConnectFailed {
                    addr,
                    source: io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect timed out after {connect_timeout:?}"),
                    ),
                });
            }
        };

        self.framed = Some(Framed::new(stream, RconCodec::new()));
        self.next_request_id = AUTH_REQUEST_ID;
        self.phase.begin_auth()?;

        let password = self.settings.password.clone();
        let mut reply = self.round_trip(PacketType::Auth, &password).await?;
        // Source servers send an empty RESPONSE_VALUE ahead of the auth reply;
        // others answer with that single frame. Only the request id decides.
        if reply.request_id() != AUTH_FAILED_ID && is_source_preamble(&reply) {
            let window = AUTH_FOLLOWUP_WINDOW.min(self.settings.read_timeout);
            match self.read_followup(window).await? {
                Some(next) => reply = next,
                None => debug!(%addr, "lone empty RESPONSE_VALUE taken as the auth reply"),
            }
        }
        if reply.request_id() == AUTH_FAILED_ID {
            warn!(%addr, "RCON authentication rejected");
            self.close().await;
            return Err(RconError::AuthenticationFailed);
        }

        self.phase.complete_auth()?;
        info!(%addr, "RCON session ready");
        Ok(())
    }

    /// Connect with the stored settings unless already ready.
    ///
    /// Retries up to `max_retries` times, `retry_delay` apart. Fatal errors
    /// (a rejected password above all) are returned at once.
    pub async fn ensure_connected(&mut self) -> Result<(), RconError> {
        if self.in_flight {
            warn!("previous exchange was abandoned mid-flight; resetting session");
            self.close().await;
        }
        if self.is_ready() {
            return Ok(());
        }

        let max_retries = self.settings.max_retries.max(1);
        let mut last_error = None;
        for attempt in 1..=max_retries {
            match self.connect().await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(attempt, "RCON connection established after retry");
                    }
                    return Ok(());
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(attempt, max_retries, error = %e, "RCON connection attempt failed");
                    last_error = Some(e);
                    if attempt < max_retries {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        Err(RconError::ConnectionExhausted {
            attempts: max_retries,
            reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Tear the session down, whatever its state, and connect again.
    pub async fn reconnect(&mut self) -> Result<(), RconError> {
        self.close().await;
        self.reconnects += 1;
        debug!(reconnects = self.reconnects, "reconnecting RCON session");
        self.ensure_connected().await
    }

    /// Close the socket if open. Idempotent; close-time errors are only logged.
    pub async fn close(&mut self) {
        if let Some(mut framed) = self.framed.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, SinkExt::<Packet>::close(&mut framed)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "error while closing RCON socket"),
                Err(_) => debug!("timed out closing RCON socket"),
            }
        }
        self.phase.force_disconnect();
        self.in_flight = false;
    }

    // ── Exchanges ────────────────────────────────────────────────

    /// Send one command and return the payload of the next frame.
    ///
    /// Requires a ready session; no reconnect is attempted here. Any I/O or
    /// framing failure drops the session before the error is returned.
    pub async fn exchange(&mut self, command: &str) -> Result<String, RconError> {
        if !self.is_ready() {
            return Err(RconError::NotConnected);
        }
        debug!(command, "sending RCON command");
        let reply = self.round_trip(PacketType::ExecCommand, command).await?;
        debug!(command, bytes = reply.payload().len(), "received RCON reply");
        Ok(reply.into_payload())
    }

    async fn round_trip(&mut self, kind: PacketType, payload: &str) -> Result<Packet, RconError> {
        let packet = Packet::new(self.take_request_id(), kind, payload)?;
        self.pace().await;

        let read_timeout = self.settings.read_timeout;
        let Some(framed) = self.framed.as_mut() else {
            return Err(RconError::NotConnected);
        };
        self.in_flight = true;
        let result = tokio::time::timeout(read_timeout, async {
            framed.send(packet).await?;
            match framed.next().await {
                Some(reply) => reply,
                None => Err(RconError::closed_by_peer()),
            }
        })
        .await
        .unwrap_or(Err(RconError::Timeout(read_timeout)));
        self.last_sent = Some(Instant::now());
        self.settle(result)
    }

    /// Wait up to `window` for one more frame without sending anything.
    ///
    /// `Ok(None)` when nothing arrived in time; the session stays up.
    async fn read_followup(&mut self, window: Duration) -> Result<Option<Packet>, RconError> {
        let Some(framed) = self.framed.as_mut() else {
            return Err(RconError::NotConnected);
        };
        self.in_flight = true;
        match tokio::time::timeout(window, framed.next()).await {
            Err(_) => {
                self.in_flight = false;
                Ok(None)
            }
            Ok(next) => self
                .settle(next.unwrap_or_else(|| Err(RconError::closed_by_peer())))
                .map(Some),
        }
    }

    fn settle(&mut self, result: Result<Packet, RconError>) -> Result<Packet, RconError> {
        match result {
            Ok(reply) => {
                self.in_flight = false;
                Ok(reply)
            }
            Err(e) => {
                debug!(error = %e, "RCON exchange failed; dropping session");
                self.teardown();
                Err(e)
            }
        }
    }

    /// Hold back until `command_interval` has elapsed since the last frame.
    async fn pace(&self) {
        if let Some(last) = self.last_sent {
            let next = last + self.settings.command_interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
    }

    fn take_request_id(&mut self) -> i32 {
        let id = self.next_request_id;
        self.next_request_id = if id == i32::MAX { AUTH_REQUEST_ID + 1 } else { id + 1 };
        id
    }

    fn teardown(&mut self) {
        self.framed = None;
        self.phase.force_disconnect();
        self.in_flight = false;
    }
}

impl<C: Connector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("addr", &self.settings.addr())
            .field("phase", &self.phase)
            .field("in_flight", &self.in_flight)
            .field("reconnects", &self.reconnects)
            .finish()
    }
}
