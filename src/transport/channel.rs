//! One websocket transport per visible session.
//!
//! The socket runs on its own thread (blocking tungstenite with a short read
//! timeout); the channel owner lives on the single-threaded event loop and
//! drains transport events via `poll`. Each connection attempt gets a fresh
//! event pipe, so a canceled attempt can never resurrect a channel whose slot
//! id has been released.

use std::io;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message};

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::session::SessionId;
use crate::transport::reconnect::{Effect, FailureKind, PolicyState, ReconnectPolicy};

/// Close code the backend sends when the remote process no longer exists and
/// cannot be resumed. All other codes are ordinary disconnects.
pub const SESSION_DEAD_CLOSE_CODE: u16 = 4001;

/// Fallback viewport until the owner reports real dimensions.
const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

/// How long the socket thread blocks in a read before checking for commands.
const READ_POLL: Duration = Duration::from_millis(20);

/// Connection status, as consumed by the rendering layer.
///
/// Failures surface here and never cross the channel boundary as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No connection attempt has been made (or the channel was closed).
    Idle,
    /// Transport opening (covers the automatic retry wait).
    Connecting,
    Connected,
    /// Clean or ordinary close. Terminal until explicit reconnect.
    Disconnected,
    /// Transport-level failure. Terminal until explicit reconnect.
    Error,
    /// No open acknowledgment within the window, twice. Terminal until
    /// explicit reconnect.
    Timeout,
    /// The remote process is gone; a new session is required.
    SessionDead,
}

/// Events reported by a transport to its owning channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The websocket handshake completed.
    Open,
    /// Raw output bytes from the remote session.
    Data(Vec<u8>),
    /// The transport closed, with the close code if one was received.
    Closed { code: Option<u16> },
    /// The transport failed before or after opening.
    Failed(String),
}

/// Outbound wire messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// Raw input bytes, forwarded as a binary frame.
    Input(Vec<u8>),
    /// Structured resize message, forwarded as a JSON text frame.
    Resize { cols: u16, rows: u16 },
}

/// Handle to a live transport.
pub trait Transport: Send {
    /// Queue a message for the remote end.
    fn send(&mut self, msg: WireMessage) -> Result<(), TransportError>;

    /// Tear the transport down. Must be safe to call more than once.
    fn shutdown(&mut self);
}

/// Opens transports; the seam that lets tests drive a channel without
/// sockets.
pub trait Connector {
    /// Start opening a transport to `url`, reporting lifecycle through
    /// `events`. Returns immediately; `TransportEvent::Open` signals success.
    fn connect(&self, url: &str, events: Sender<TransportEvent>) -> Box<dyn Transport>;
}

/// Timing configuration for one channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    pub connect_timeout: Duration,
    pub retry_backoff: Duration,
}

impl ChannelConfig {
    /// Build from the client connection configuration.
    pub fn from_connection(config: &ConnectionConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Maintains exactly one live transport for one session and presents a
/// uniform status + I/O surface.
pub struct ConnectionChannel {
    session_id: SessionId,
    url: String,
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    status: ChannelStatus,
    transport: Option<Box<dyn Transport>>,
    events: Receiver<TransportEvent>,
    deadline: Option<Instant>,
    cols: u16,
    rows: u16,
}

impl ConnectionChannel {
    /// Create an idle channel for a session endpoint.
    pub fn new(
        session_id: SessionId,
        url: String,
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        // Placeholder pipe; replaced when a transport is opened.
        let (_tx, events) = mpsc::channel();
        Self {
            session_id,
            url,
            config,
            connector,
            policy: ReconnectPolicy::new(),
            status: ChannelStatus::Idle,
            transport: None,
            events,
            deadline: None,
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }

    /// The session this channel is bound to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The resolved endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current status.
    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    /// Open the transport. No-op if an attempt is already underway.
    pub fn connect(&mut self, now: Instant) {
        let effects = self.policy.start();
        self.apply(&effects, now);
    }

    /// Explicit reconnect: closes an open transport first, resets the
    /// one-shot retry, and restarts the cycle.
    pub fn reconnect(&mut self, now: Instant) {
        tracing::debug!(session = %self.session_id, "explicit reconnect");
        let effects = self.policy.reconnect();
        self.apply(&effects, now);
    }

    /// Forward raw input bytes. Silently dropped unless connected; there is
    /// no queuing across disconnects.
    pub fn send_input(&mut self, bytes: &[u8]) {
        if self.status != ChannelStatus::Connected {
            tracing::trace!(session = %self.session_id, "input dropped: not connected");
            return;
        }
        self.send(WireMessage::Input(bytes.to_vec()));
    }

    /// Record the viewport dimensions and, while connected, send the resize
    /// message. The local recording happens regardless of connection state so
    /// the display can always re-fit.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        if self.status == ChannelStatus::Connected {
            self.send(WireMessage::Resize { cols, rows });
        }
    }

    /// Last recorded viewport dimensions (cols, rows).
    pub fn dimensions(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Tear the channel down: cancel any pending timer and close the
    /// transport synchronously, so a stale retry can never fire for a slot
    /// id that has been released.
    pub fn close(&mut self) {
        let effects = self.policy.reset();
        self.apply(&effects, Instant::now());
        self.status = ChannelStatus::Idle;
    }

    /// Drive timers and drain transport events; returns output byte chunks
    /// for the owning renderer.
    pub fn poll(&mut self, now: Instant) -> Vec<Vec<u8>> {
        if let Some(deadline) = self.deadline {
            if now >= deadline {
                self.deadline = None;
                let effects = self.policy.on_timer();
                self.apply(&effects, now);
            }
        }

        let mut output = Vec::new();
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            match event {
                TransportEvent::Open => {
                    let effects = self.policy.on_open();
                    self.apply(&effects, now);
                }
                TransportEvent::Data(bytes) => {
                    if self.status == ChannelStatus::Connected {
                        output.push(bytes);
                    }
                }
                TransportEvent::Closed { code } => {
                    let kind = if code == Some(SESSION_DEAD_CLOSE_CODE) {
                        FailureKind::SessionDead
                    } else {
                        FailureKind::Disconnected
                    };
                    tracing::debug!(session = %self.session_id, ?code, "transport closed");
                    let effects = self.policy.on_close(kind);
                    self.apply(&effects, now);
                }
                TransportEvent::Failed(reason) => {
                    tracing::warn!(session = %self.session_id, %reason, "transport failed");
                    let effects = self.policy.on_close(FailureKind::Transport);
                    self.apply(&effects, now);
                }
            }
        }
        output
    }

    fn apply(&mut self, effects: &[Effect], now: Instant) {
        for effect in effects {
            match effect {
                Effect::OpenTransport => {
                    let (tx, rx) = mpsc::channel();
                    self.events = rx;
                    self.transport = Some(self.connector.connect(&self.url, tx));
                }
                Effect::CloseTransport => {
                    if let Some(mut transport) = self.transport.take() {
                        transport.shutdown();
                    }
                }
                Effect::ArmConnectTimer => {
                    self.deadline = Some(now + self.config.connect_timeout);
                }
                Effect::ArmRetryTimer => {
                    self.deadline = Some(now + self.config.retry_backoff);
                }
                Effect::CancelTimer => {
                    self.deadline = None;
                }
                Effect::SendDimensions => {
                    let (cols, rows) = (self.cols, self.rows);
                    self.send(WireMessage::Resize { cols, rows });
                }
            }
        }
        self.status = status_from(self.policy.state());
    }

    fn send(&mut self, msg: WireMessage) {
        if let Some(transport) = self.transport.as_mut() {
            if let Err(err) = transport.send(msg) {
                tracing::warn!(session = %self.session_id, %err, "send failed");
            }
        }
    }
}

impl Drop for ConnectionChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn status_from(state: PolicyState) -> ChannelStatus {
    match state {
        PolicyState::Idle => ChannelStatus::Idle,
        PolicyState::Connecting | PolicyState::Retrying => ChannelStatus::Connecting,
        PolicyState::Connected => ChannelStatus::Connected,
        PolicyState::Failed(FailureKind::Timeout) => ChannelStatus::Timeout,
        PolicyState::Failed(FailureKind::Transport) => ChannelStatus::Error,
        PolicyState::Failed(FailureKind::Disconnected) => ChannelStatus::Disconnected,
        PolicyState::Failed(FailureKind::SessionDead) => ChannelStatus::SessionDead,
    }
}

/// Production connector: blocking tungstenite on a dedicated thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &str, events: Sender<TransportEvent>) -> Box<dyn Transport> {
        let (commands, command_rx) = mpsc::channel();
        let url = url.to_string();
        thread::spawn(move || socket_thread(&url, &events, &command_rx));
        Box::new(WsTransport { commands })
    }
}

enum Command {
    Send(WireMessage),
    Shutdown,
}

struct WsTransport {
    commands: Sender<Command>,
}

impl Transport for WsTransport {
    fn send(&mut self, msg: WireMessage) -> Result<(), TransportError> {
        self.commands
            .send(Command::Send(msg))
            .map_err(|_| TransportError::Closed)
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

fn socket_thread(url: &str, events: &Sender<TransportEvent>, commands: &Receiver<Command>) {
    let (mut socket, _response) = match tungstenite::connect(url) {
        Ok(pair) => pair,
        Err(err) => {
            let _ = events.send(TransportEvent::Failed(err.to_string()));
            return;
        }
    };

    if let Err(err) = set_read_timeout(socket.get_mut()) {
        let _ = events.send(TransportEvent::Failed(err.to_string()));
        return;
    }

    if events.send(TransportEvent::Open).is_ok() {
        pump(&mut socket, events, commands);
    }
    let _ = socket.close(None);
}

fn pump(
    socket: &mut tungstenite::WebSocket<MaybeTlsStream<TcpStream>>,
    events: &Sender<TransportEvent>,
    commands: &Receiver<Command>,
) {
    loop {
        // Outbound first, so input and resize aren't starved by a chatty
        // remote.
        loop {
            match commands.try_recv() {
                Ok(Command::Send(msg)) => {
                    if let Err(err) = socket.send(encode(msg)) {
                        let _ = events.send(TransportEvent::Failed(err.to_string()));
                        return;
                    }
                }
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Binary(data)) => {
                if events
                    .send(TransportEvent::Data(data.as_ref().to_vec()))
                    .is_err()
                {
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                let code = frame.map(|f| u16::from(f.code));
                let _ = events.send(TransportEvent::Closed { code });
                return;
            }
            // Output is binary-only; text/ping/pong frames carry nothing for us.
            Ok(_) => {}
            Err(WsError::Io(err))
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                let _ = events.send(TransportEvent::Closed { code: None });
                return;
            }
            Err(err) => {
                let _ = events.send(TransportEvent::Failed(err.to_string()));
                return;
            }
        }
    }
}

fn encode(msg: WireMessage) -> Message {
    match msg {
        WireMessage::Input(bytes) => Message::binary(bytes),
        WireMessage::Resize { cols, rows } => {
            Message::text(json!({ "resize": { "cols": cols, "rows": rows } }).to_string())
        }
    }
}

fn set_read_timeout(stream: &mut MaybeTlsStream<TcpStream>) -> io::Result<()> {
    match stream {
        MaybeTlsStream::Plain(s) => s.set_read_timeout(Some(READ_POLL)),
        MaybeTlsStream::NativeTls(s) => s.get_ref().set_read_timeout(Some(READ_POLL)),
        _ => Ok(()),
    }
}
