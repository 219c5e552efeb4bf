use crate::config::SocketConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::traits::*;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// WebSocket close codes used by feed owners
pub mod close_code {
    /// Normal closure, the owner asked for it
    pub const NORMAL: u16 = 1000;
    /// Peer closed without a status code
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame (or never opened)
    pub const ABNORMAL: u16 = 1006;
}

/// Commands accepted by the socket task
#[derive(Debug)]
pub enum SocketCommand {
    /// Send a message to the server
    Send(WsMessage),
    /// Send a close frame and stop the task
    Close { code: u16, reason: String },
}

/// Lifecycle events emitted by the socket task, in socket order
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// WebSocket upgrade completed
    Opened,
    /// Text or binary payload received
    Message(WsMessage),
    /// Socket-level failure; a `Closed` event always follows
    Error(String),
    /// Socket finished; always the last event
    Closed { code: u16, reason: String },
}

/// Receiving half of a socket's event stream
pub type SocketEvents = UnboundedReceiver<SocketEvent>;

/// Socket metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub pings_answered: u64,
    pub connection_state: ConnectionState,
}

/// Handle to a running socket task
///
/// Dropping every handle makes the task close the socket normally.
pub struct SocketHandle {
    /// Command channel sender
    command_tx: UnboundedSender<SocketCommand>,
    /// Atomic connection state
    state: Arc<AtomicConnectionState>,
    /// Atomic metrics
    metrics: Arc<AtomicMetrics>,
    /// Socket task handle, absent for channel-only handles
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl SocketHandle {
    /// Create a handle that only forwards commands to `command_tx`
    ///
    /// Used by owners that drive a socket themselves (in-process bridges,
    /// test doubles). The state stays `Connected` until `close` is called.
    pub fn from_channel(command_tx: UnboundedSender<SocketCommand>) -> Self {
        Self {
            command_tx,
            state: Arc::new(AtomicConnectionState::new(ConnectionState::Connected)),
            metrics: Arc::new(AtomicMetrics::new()),
            task_handle: None,
        }
    }

    /// Send a message through the WebSocket
    pub fn send(&self, message: WsMessage) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Send(message))
            .map_err(|e| SocketError::ChannelSend(e.to_string()))?;
        Ok(())
    }

    /// Ask the socket task to close with `code`
    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        if self.task_handle.is_none() {
            self.state.set(ConnectionState::Closing);
        }
        self.command_tx
            .send(SocketCommand::Close {
                code,
                reason: reason.into(),
            })
            .map_err(|e| SocketError::ChannelSend(e.to_string()))
    }

    /// Stop the socket task immediately, without a close handshake
    pub fn abort(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        self.state.set(ConnectionState::Disconnected);
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            pings_answered: self.metrics.pings_answered(),
            connection_state: self.state.get(),
        }
    }
}

/// Spawn the socket task for `config`
pub(crate) fn spawn_socket(config: SocketConfig) -> (SocketHandle, SocketEvents) {
    let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
    let metrics = Arc::new(AtomicMetrics::new());

    let (command_tx, command_rx) = unbounded_channel();
    let (event_tx, event_rx) = unbounded_channel();

    let task_handle = {
        let state = Arc::clone(&state);
        let metrics = Arc::clone(&metrics);

        tokio::spawn(async move {
            run_socket(config, state, metrics, command_rx, event_tx).await;
        })
    };

    let handle = SocketHandle {
        command_tx,
        state,
        metrics,
        task_handle: Some(task_handle),
    };

    (handle, event_rx)
}

/// Main socket task: connect once, pump frames, report the close
async fn run_socket(
    config: SocketConfig,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    mut command_rx: UnboundedReceiver<SocketCommand>,
    event_tx: UnboundedSender<SocketEvent>,
) {
    state.set(ConnectionState::Connecting);
    debug!("[{}] Connecting", config.label);

    let connection_result = match config.connect_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, connect_async(config.url.as_str())).await {
            Ok(result) => result.map_err(|e| SocketError::WebSocket(e.to_string())),
            Err(_) => Err(SocketError::Timeout(format!("connect exceeded {:?}", timeout))),
        },
        None => connect_async(config.url.as_str())
            .await
            .map_err(|e| SocketError::WebSocket(e.to_string())),
    };

    let ws_stream = match connection_result {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            warn!("[{}] Failed to connect: {}", config.label, e);
            state.set(ConnectionState::Disconnected);
            let _ = event_tx.send(SocketEvent::Error(e.to_string()));
            let _ = event_tx.send(SocketEvent::Closed {
                code: close_code::ABNORMAL,
                reason: e.to_string(),
            });
            return;
        }
    };

    info!("[{}] Connected", config.label);
    state.set(ConnectionState::Connected);
    let _ = event_tx.send(SocketEvent::Opened);

    let (code, reason) =
        match message_loop(ws_stream, &config, &state, &metrics, &mut command_rx, &event_tx).await {
            Ok(closed) => closed,
            Err(e) => {
                warn!("[{}] Socket error: {}", config.label, e);
                let _ = event_tx.send(SocketEvent::Error(e.to_string()));
                (close_code::ABNORMAL, e.to_string())
            }
        };

    state.set(ConnectionState::Disconnected);
    debug!("[{}] Closed with code {}", config.label, code);
    let _ = event_tx.send(SocketEvent::Closed { code, reason });
}

/// Main message processing loop
///
/// Returns the close code and reason on an orderly close, or the error that
/// broke the socket.
async fn message_loop(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    config: &SocketConfig,
    state: &AtomicConnectionState,
    metrics: &AtomicMetrics,
    command_rx: &mut UnboundedReceiver<SocketCommand>,
    event_tx: &UnboundedSender<SocketEvent>,
) -> Result<(u16, String)> {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(payload))) => {
                        write.send(Message::Pong(payload)).await.map_err(|e| {
                            SocketError::WebSocket(format!("Failed to send pong: {}", e))
                        })?;
                        metrics.increment_pings();
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((close_code::NO_STATUS, String::new()));
                        debug!("[{}] Server closed ({}): {}", config.label, code, reason);
                        return Ok((code, reason));
                    }
                    Some(Ok(msg)) => {
                        if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                            metrics.increment_received();
                            let _ = event_tx.send(SocketEvent::Message(ws_msg));
                        }
                    }
                    Some(Err(e)) => {
                        return Err(SocketError::WebSocket(e.to_string()));
                    }
                    None => {
                        return Err(SocketError::ConnectionClosed("Stream ended".into()));
                    }
                }
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(SocketCommand::Send(msg)) => {
                        write.send(ws_message_to_tungstenite(&msg)).await.map_err(|e| {
                            SocketError::WebSocket(e.to_string())
                        })?;
                        metrics.increment_sent();
                    }
                    Some(SocketCommand::Close { code, reason }) => {
                        state.set(ConnectionState::Closing);
                        send_close(&mut write, code, &reason).await;
                        return Ok((code, reason));
                    }
                    None => {
                        debug!("[{}] All handles dropped, closing", config.label);
                        state.set(ConnectionState::Closing);
                        send_close(&mut write, close_code::NORMAL, "handle dropped").await;
                        return Ok((close_code::NORMAL, "handle dropped".to_string()));
                    }
                }
            }
        }
    }
}

async fn send_close<S>(write: &mut S, code: u16, reason: &str)
where
    S: futures::Sink<Message> + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    };
    let _ = write.send(Message::Close(Some(frame))).await;
    let _ = write.close().await;
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: &WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.clone()),
        WsMessage::Binary(data) => Message::Binary(data.clone()),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
