//! Test doubles: scripted connectors, an in-memory RCON server and a
//! stream wrapper that records the order of reads and writes.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio_test::io::Mock;
use tokio_util::codec::Framed;

use crate::codec::RconCodec;
use crate::message::{AUTH_FAILED_ID, PacketType};
use crate::network::{Connector, RconSettings};
use crate::packet::Packet;

pub(crate) fn test_settings() -> RconSettings {
    let mut settings = RconSettings::new("127.0.0.1", 25575, "secret");
    settings.connect_timeout = Duration::from_secs(2);
    settings.read_timeout = Duration::from_secs(2);
    settings.retry_delay = Duration::ZERO;
    settings.command_interval = Duration::ZERO;
    settings
}

pub(crate) fn auth_frame(request_id: i32, password: &str) -> Vec<u8> {
    Packet::auth(request_id, password).unwrap().to_bytes()
}

pub(crate) fn command_frame(request_id: i32, command: &str) -> Vec<u8> {
    Packet::command(request_id, command).unwrap().to_bytes()
}

pub(crate) fn reply_frame(request_id: i32, payload: &str) -> Vec<u8> {
    Packet::reply(request_id, payload).to_bytes()
}

// ── MockConnector ────────────────────────────────────────────────

/// Hands out pre-built `tokio_test` mocks, one per connect. Refuses once
/// they run out.
pub(crate) struct MockConnector {
    mocks: Mutex<VecDeque<Mock>>,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub(crate) fn new(mocks: Vec<Mock>) -> Self {
        Self {
            mocks: Mutex::new(mocks.into()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Stream = Mock;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<Mock> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.mocks
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::ErrorKind::ConnectionRefused.into())
    }
}

// ── FakeConnector ────────────────────────────────────────────────

/// What the fake server does with one command.
pub(crate) enum Reply {
    Respond(String),
    /// Close the connection without answering.
    Drop,
    /// Keep the connection open and never answer.
    Hang,
}

type Handler = dyn Fn(usize, &str) -> Reply + Send + Sync;

/// Frames sent in answer to an auth packet, given the id to answer with
/// (the request id, or -1 for a wrong password).
type AuthAnswer = dyn Fn(i32) -> Vec<Packet> + Send + Sync;

/// Each connect spawns an in-memory RCON server on a duplex pipe.
///
/// The handler gets the zero-based connection number and the command text.
pub(crate) struct FakeConnector {
    password: String,
    handler: Arc<Handler>,
    auth_answer: Arc<AuthAnswer>,
    connections: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub(crate) fn new<F>(password: &str, handler: F) -> Self
    where
        F: Fn(usize, &str) -> Reply + Send + Sync + 'static,
    {
        Self {
            password: password.to_string(),
            handler: Arc::new(handler),
            auth_answer: Arc::new(|id| vec![Packet::auth_reply(id)]),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the default single AUTH_RESPONSE with other frames.
    pub(crate) fn with_auth_answer<F>(mut self, answer: F) -> Self
    where
        F: Fn(i32) -> Vec<Packet> + Send + Sync + 'static,
    {
        self.auth_answer = Arc::new(answer);
        self
    }

    pub(crate) fn connections(&self) -> Arc<AtomicUsize> {
        self.connections.clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<DuplexStream> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let conn = self.connections.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(serve(
            server,
            conn,
            self.password.clone(),
            self.handler.clone(),
            self.auth_answer.clone(),
        ));
        Ok(client)
    }
}

async fn serve(
    stream: DuplexStream,
    conn: usize,
    password: String,
    handler: Arc<Handler>,
    auth_answer: Arc<AuthAnswer>,
) {
    let mut framed = Framed::new(stream, RconCodec::new());

    let Some(Ok(auth)) = framed.next().await else {
        return;
    };
    let id = if auth.kind() == PacketType::Auth.code() && auth.payload() == password {
        auth.request_id()
    } else {
        AUTH_FAILED_ID
    };
    for frame in auth_answer(id) {
        if framed.send(frame).await.is_err() {
            return;
        }
    }
    if id == AUTH_FAILED_ID {
        return;
    }

    while let Some(Ok(request)) = framed.next().await {
        match handler(conn, request.payload()) {
            Reply::Respond(payload) => {
                if framed
                    .send(Packet::reply(request.request_id(), payload))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Reply::Drop => return,
            Reply::Hang => {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ── Wire recording ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireOp {
    Write,
    Read,
}

pub(crate) type WireLog = Arc<Mutex<Vec<WireOp>>>;

/// Merge runs of the same operation: a reply split over two reads is still
/// one read.
pub(crate) fn collapsed(ops: &[WireOp]) -> Vec<WireOp> {
    let mut out: Vec<WireOp> = Vec::new();
    for op in ops {
        if out.last() != Some(op) {
            out.push(*op);
        }
    }
    out
}

pub(crate) struct RecordingStream<S> {
    inner: S,
    log: WireLog,
}

impl<S: AsyncRead + Unpin> AsyncRead for RecordingStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let result = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(result, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.log.lock().unwrap().push(WireOp::Read);
        }
        result
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for RecordingStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(result, Poll::Ready(Ok(n)) if n > 0) {
            self.log.lock().unwrap().push(WireOp::Write);
        }
        result
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Wraps another connector so every stream it opens shares one wire log.
pub(crate) struct RecordingConnector<C> {
    inner: C,
    log: WireLog,
}

impl<C> RecordingConnector<C> {
    pub(crate) fn new(inner: C) -> Self {
        Self {
            inner,
            log: Arc::default(),
        }
    }

    pub(crate) fn log(&self) -> WireLog {
        self.log.clone()
    }
}

#[async_trait]
impl<C: Connector> Connector for RecordingConnector<C> {
    type Stream = RecordingStream<C::Stream>;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream> {
        let inner = self.inner.connect(host, port).await?;
        Ok(RecordingStream {
            inner,
            log: self.log.clone(),
        })
    }
}
