//! Common test utilities for FeedSockets integration tests
//!
//! Provides an in-process WebSocket server that can greet clients with
//! scripted frames, echo payloads and record what it receives.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// What the server does with each accepted connection
#[derive(Clone, Default)]
pub struct ServerScript {
    /// Frames sent right after the handshake
    pub greeting: Vec<Message>,
    /// Close with this code once the greeting is sent
    pub close_after_greeting: Option<u16>,
}

/// A simple mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Message>>>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Start an echo server with no greeting
    pub async fn start() -> Self {
        Self::start_with(ServerScript::default()).await
    }

    /// Create and start a new mock WebSocket server following `script`
    pub async fn start_with(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let shutdown_clone = shutdown.clone();
        let received_clone = received.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                let received = received_clone.clone();
                                let script = script.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, script, received, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            received,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        script: ServerScript,
        received: Arc<Mutex<Vec<Message>>>,
        shutdown: Arc<Notify>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        for frame in script.greeting {
            if write.send(frame).await.is_err() {
                return;
            }
        }

        if let Some(code) = script.close_after_greeting {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: "scripted close".into(),
            };
            let _ = write.send(Message::Close(Some(frame))).await;
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            received.lock().unwrap().push(msg.clone());
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Frames received from clients so far
    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Test fixture for connection states
pub mod fixtures {
    use feedsockets::core::connection_state::{AtomicConnectionState, ConnectionState};

    pub fn disconnected_state() -> AtomicConnectionState {
        AtomicConnectionState::new(ConnectionState::Disconnected)
    }

    pub fn connected_state() -> AtomicConnectionState {
        AtomicConnectionState::new(ConnectionState::Connected)
    }

    pub fn connecting_state() -> AtomicConnectionState {
        AtomicConnectionState::new(ConnectionState::Connecting)
    }
}
