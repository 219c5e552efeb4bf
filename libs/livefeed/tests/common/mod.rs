//! Common test utilities for live feed integration tests
//!
//! `MockConnector` stands in for the broker: every socket the registry opens
//! is recorded, and tests drive it by pushing lifecycle events and reading
//! back the commands the registry sent.

#![allow(dead_code)]

use async_trait::async_trait;
use feedsockets::{SocketCommand, SocketEvent, SocketEvents, SocketHandle, WsMessage};
use livefeed::domain::{BrokerConnectionLookup, BrokerCredentials, InstrumentLookup, InstrumentRecord};
use livefeed::infrastructure::feed::{ConnectRequest, FeedConnector, FeedSettings};
use livefeed::infrastructure::{AccountEntry, StaticDirectory};
use livefeed::{FeedError, FeedEvent, FeedRegistry};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// =============================================================================
// Mock connector
// =============================================================================

struct MockSocket {
    request: ConnectRequest,
    events: UnboundedSender<SocketEvent>,
    commands: UnboundedReceiver<SocketCommand>,
}

/// Records every socket the registry opens
#[derive(Clone, Default)]
pub struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl FeedConnector for MockConnector {
    fn connect(&self, request: ConnectRequest) -> (SocketHandle, SocketEvents) {
        let (command_tx, command_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded_channel();

        self.sockets.lock().unwrap().push(MockSocket {
            request,
            events: event_tx,
            commands: command_rx,
        });

        (SocketHandle::from_channel(command_tx), event_rx)
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sockets opened so far
    pub fn count(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    /// Index of the most recently opened socket
    pub fn last(&self) -> usize {
        self.count() - 1
    }

    pub fn request(&self, index: usize) -> ConnectRequest {
        self.sockets.lock().unwrap()[index].request.clone()
    }

    fn push(&self, index: usize, event: SocketEvent) {
        let _ = self.sockets.lock().unwrap()[index].events.send(event);
    }

    pub fn open(&self, index: usize) {
        self.push(index, SocketEvent::Opened);
    }

    pub fn frame(&self, index: usize, bytes: Vec<u8>) {
        self.push(index, SocketEvent::Message(WsMessage::Binary(bytes)));
    }

    pub fn error(&self, index: usize, message: &str) {
        self.push(index, SocketEvent::Error(message.to_string()));
    }

    pub fn close(&self, index: usize, code: u16) {
        self.push(
            index,
            SocketEvent::Closed {
                code,
                reason: "mock close".to_string(),
            },
        );
    }

    /// Drain the commands the registry sent on socket `index`
    pub fn take_commands(&self, index: usize) -> Vec<SocketCommand> {
        let mut sockets = self.sockets.lock().unwrap();
        let mut commands = Vec::new();
        while let Ok(command) = sockets[index].commands.try_recv() {
            commands.push(command);
        }
        commands
    }

    /// Decoded subscription requests sent on socket `index`
    pub fn subscriptions(&self, index: usize) -> Vec<serde_json::Value> {
        self.take_commands(index)
            .into_iter()
            .filter_map(|command| match command {
                SocketCommand::Send(WsMessage::Text(text)) => serde_json::from_str(&text).ok(),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Lookup that always fails, as a broken database would
pub struct FailingLookup;

#[async_trait]
impl BrokerConnectionLookup for FailingLookup {
    async fn broker_connection(&self, _user_id: &str) -> livefeed::Result<Option<BrokerCredentials>> {
        Err(FeedError::Lookup("connection refused".to_string()))
    }
}

#[async_trait]
impl InstrumentLookup for FailingLookup {
    async fn instruments(&self, _user_id: &str) -> livefeed::Result<Vec<InstrumentRecord>> {
        Err(FeedError::Lookup("connection refused".to_string()))
    }
}

pub fn account(user_id: &str, instruments: usize) -> AccountEntry {
    AccountEntry {
        user_id: user_id.to_string(),
        client_id: Some("1000123".to_string()),
        access_token: Some(format!("token-{}", user_id)),
        instruments: (0..instruments).map(|i| (1000 + i).to_string()).collect(),
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub registry: FeedRegistry,
    pub connector: MockConnector,
    pub directory: Arc<StaticDirectory>,
    pub events: broadcast::Receiver<FeedEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let directory = Arc::new(StaticDirectory::new());
        let connector = MockConnector::new();
        let registry = FeedRegistry::builder(directory.clone(), directory.clone())
            .settings(FeedSettings {
                feed_url: "ws://feed.test".to_string(),
                connect_timeout: None,
                ..FeedSettings::default()
            })
            .connector(connector.clone())
            .event_capacity(1024)
            .build();
        let events = registry.subscribe_events();

        Self {
            registry,
            connector,
            directory,
            events,
        }
    }

    /// Drain the feed events published so far
    pub fn drain_events(&mut self) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Let spawned pumps and timers process what is already queued
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time and let woken timers run
pub async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

/// Little-endian ticker frame
pub fn ticker_frame(security_id: i32, price: f32, trade_time: i32) -> Vec<u8> {
    let mut frame = vec![0u8; 17];
    frame[1] = 2;
    frame[5..9].copy_from_slice(&security_id.to_le_bytes());
    frame[9..13].copy_from_slice(&price.to_le_bytes());
    frame[13..17].copy_from_slice(&trade_time.to_le_bytes());
    frame
}
