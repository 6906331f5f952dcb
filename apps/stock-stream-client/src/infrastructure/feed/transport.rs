//! WebSocket Transport
//!
//! [`Transport`] adapter over tokio-tungstenite. Each session runs in its
//! own task that owns the socket; the [`WsSession`] handle talks to it over
//! a command channel and all socket activity is reported as
//! [`TransportEvent`]s.
//!
//! # Event Guarantees
//!
//! - `Opened` is emitted once the handshake completes.
//! - `Error` is always followed by `Closed`.
//! - `Closed` is emitted exactly once and is the last event.
//! - A connection lost without a close frame reports code 1006; a close
//!   frame without a status reports 1005.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::application::ports::{
    CloseReason, Transport, TransportError, TransportEvent, TransportSession,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// =============================================================================
// Configuration
// =============================================================================

/// WebSocket transport configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsTransportConfig {
    /// Maximum time for the TCP/TLS/WebSocket handshake.
    pub connect_timeout: Duration,
    /// Maximum time to wait for the peer to echo our close frame.
    pub close_timeout: Duration,
}

impl Default for WsTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(2),
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    config: WsTransportConfig,
}

impl WsTransport {
    /// Create a transport with custom timeouts.
    #[must_use]
    pub const fn new(config: WsTransportConfig) -> Self {
        Self { config }
    }
}

impl Transport for WsTransport {
    type Session = WsSession;

    fn connect(
        &self,
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<WsSession, TransportError> {
        let request = url
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        match request.uri().scheme_str() {
            Some("ws" | "wss") => {}
            other => {
                return Err(TransportError::InvalidEndpoint {
                    url: url.to_string(),
                    reason: format!("unsupported scheme: {}", other.unwrap_or("none")),
                });
            }
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(request, commands_rx, events, self.config));

        Ok(WsSession {
            commands: commands_tx,
        })
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug)]
enum SessionCommand {
    Send(String),
    Close { code: u16, reason: String },
}

/// Handle to a running WebSocket session.
#[derive(Debug, Clone)]
pub struct WsSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl TransportSession for WsSession {
    fn send(&self, text: String) -> Result<(), TransportError> {
        self.commands
            .send(SessionCommand::Send(text))
            .map_err(|_| TransportError::SessionClosed)
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.commands.send(SessionCommand::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

async fn run_session(
    request: Request,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
    config: WsTransportConfig,
) {
    let emit = |event: TransportEvent| {
        let _ = events.send(event);
    };
    let fail = |message: String| {
        emit(TransportEvent::Error(message.clone()));
        emit(TransportEvent::Closed(CloseReason::abnormal(message)));
    };

    // Frames queued before the handshake completes are sent right after it.
    let mut queued = Vec::new();
    let connect = tokio::time::timeout(
        config.connect_timeout,
        tokio_tungstenite::connect_async(request),
    );
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => break match result {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    fail(e.to_string());
                    return;
                }
                Err(_) => {
                    fail("connect timed out".to_string());
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(SessionCommand::Send(text)) => queued.push(text),
                Some(SessionCommand::Close { code, reason }) => {
                    debug!("Session closed before handshake completed");
                    emit(TransportEvent::Closed(CloseReason::new(code, reason)));
                    return;
                }
                None => {
                    emit(TransportEvent::Closed(CloseReason::new(
                        CloseReason::NORMAL,
                        "session dropped",
                    )));
                    return;
                }
            },
        }
    };

    emit(TransportEvent::Opened);
    let (mut write, mut read) = stream.split();

    for text in queued {
        if let Err(e) = write.send(Message::Text(text.into())).await {
            fail(e.to_string());
            return;
        }
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Send(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        fail(e.to_string());
                        return;
                    }
                }
                Some(SessionCommand::Close { code, reason }) => {
                    let reason = close_handshake(&mut write, &mut read, code, reason, config.close_timeout).await;
                    emit(TransportEvent::Closed(reason));
                    return;
                }
                None => {
                    let reason = close_handshake(
                        &mut write,
                        &mut read,
                        CloseReason::NORMAL,
                        "session dropped".to_string(),
                        config.close_timeout,
                    )
                    .await;
                    emit(TransportEvent::Closed(reason));
                    return;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Frame(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => emit(TransportEvent::Frame(text)),
                    Err(_) => emit(TransportEvent::UndecodableFrame(data.len())),
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        fail(e.to_string());
                        return;
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let _ = write.close().await;
                    emit(TransportEvent::Closed(peer_close_reason(frame)));
                    return;
                }
                Some(Err(e)) => {
                    fail(e.to_string());
                    return;
                }
                None => {
                    emit(TransportEvent::Closed(CloseReason::abnormal("connection lost")));
                    return;
                }
            },
        }
    }
}

/// Send our close frame and wait for the echo.
async fn close_handshake(
    write: &mut WsWrite,
    read: &mut WsRead,
    code: u16,
    reason: String,
    timeout: Duration,
) -> CloseReason {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.clone().into(),
    };
    if let Err(e) = write.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Failed to send close frame");
        return CloseReason::abnormal(e.to_string());
    }

    let echo = tokio::time::timeout(timeout, async {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Close(frame)) => return Some(peer_close_reason(frame)),
                Ok(_) => {}
                Err(_) => break,
            }
        }
        None
    })
    .await;

    match echo {
        Ok(Some(echoed)) => echoed,
        Ok(None) => CloseReason::new(code, reason),
        Err(_) => {
            warn!(code, "Close handshake timed out");
            CloseReason::abnormal("close handshake timed out")
        }
    }
}

fn peer_close_reason(frame: Option<CloseFrame>) -> CloseReason {
    frame.map_or_else(
        || CloseReason::new(CloseReason::NO_STATUS, ""),
        |f| CloseReason::new(u16::from(f.code), f.reason.as_str()),
    )
}
