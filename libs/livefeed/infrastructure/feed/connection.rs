//! Per-user feed connection
//!
//! Holds everything the registry keeps for one user: the socket handle, the
//! subscription set, the credentials the socket was opened with, the retry
//! counter and any pending reconnect timer. Each socket is tagged with the
//! generation it was opened for.

use super::events::FeedEvent;
use super::registry::{RegistryInner, SubscriptionSummary};
use super::subscription_set::SubscriptionSet;
use crate::domain::{BrokerCredentials, Instrument};
use crate::error::{FeedError, Result};
use crate::infrastructure::dhan::{build_batches, redact_feed_url};
use feedsockets::{
    close_code, FrameDecoder, SocketBuilder, SocketEvent, SocketEvents, SocketHandle, WsMessage,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// =============================================================================
// Connector - opens sockets
// =============================================================================

/// Everything needed to open one feed socket
#[derive(Clone)]
pub struct ConnectRequest {
    pub user_id: String,
    pub generation: u64,
    /// Full handshake URL, token included
    pub url: String,
    pub connect_timeout: Option<Duration>,
}

/// Opens feed sockets for the registry
///
/// The production connector dials the broker; tests plug in a scripted one.
pub trait FeedConnector: Send + Sync + 'static {
    fn connect(&self, request: ConnectRequest) -> (SocketHandle, SocketEvents);
}

/// Connector backed by the feedsockets transport
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl FeedConnector for TungsteniteConnector {
    fn connect(&self, request: ConnectRequest) -> (SocketHandle, SocketEvents) {
        let builder = SocketBuilder::new()
            .url(request.url)
            .label(format!("Dhan WS {}#{}", request.user_id, request.generation));

        match request.connect_timeout {
            Some(timeout) => builder.connect_timeout(timeout).spawn(),
            None => builder.spawn(),
        }
    }
}

// =============================================================================
// Connection parameters
// =============================================================================

/// Inputs for opening a user's socket
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub user_id: String,
    pub credentials: BrokerCredentials,
    pub security_ids: Vec<String>,
}

impl ConnectionParams {
    /// Reject parameters that can never produce a working socket
    pub fn validate(&self) -> Result<()> {
        if let Some(field) = self.credentials.missing_field() {
            warn!("[Dhan WS] User {} has no {}, not connecting", self.user_id, field);
            return Err(FeedError::IncompleteCredentials {
                user_id: self.user_id.clone(),
                field,
            });
        }

        if self.security_ids.iter().all(|id| id.trim().is_empty()) {
            warn!("[Dhan WS] User {} has no instruments, not connecting", self.user_id);
            return Err(FeedError::NoInstruments(self.user_id.clone()));
        }

        Ok(())
    }
}

// =============================================================================
// Connection state
// =============================================================================

/// A scheduled automatic reconnect
pub(crate) struct PendingReconnect {
    pub(crate) attempt: u32,
    pub(crate) delay: Duration,
    pub(crate) timer: JoinHandle<()>,
}

/// Registry-owned state for one user
pub(crate) struct UserConnection {
    pub(crate) generation: u64,
    pub(crate) credentials: BrokerCredentials,
    pub(crate) subscriptions: Arc<SubscriptionSet>,
    pub(crate) socket: Option<SocketHandle>,
    pub(crate) open: bool,
    /// Consecutive failed attempts since the last successful open
    pub(crate) reconnect_attempts: u32,
    pub(crate) pending: Option<PendingReconnect>,
}

impl UserConnection {
    pub(crate) fn new(
        generation: u64,
        credentials: BrokerCredentials,
        subscriptions: SubscriptionSet,
        socket: SocketHandle,
    ) -> Self {
        Self {
            generation,
            credentials,
            subscriptions: Arc::new(subscriptions),
            socket: Some(socket),
            open: false,
            reconnect_attempts: 0,
            pending: None,
        }
    }

    /// Send every subscription batch on the current socket
    ///
    /// Returns the number of requests sent.
    pub(crate) fn send_subscriptions(&self, batch_size: usize) -> Result<usize> {
        let Some(socket) = &self.socket else {
            return Ok(0);
        };

        let instruments: Vec<Instrument> = self
            .subscriptions
            .ids()
            .iter()
            .map(|id| Instrument::nse_equity(id.as_str()))
            .collect();

        let requests = build_batches(&instruments, batch_size);
        for request in &requests {
            socket.send(request.to_ws_message()?)?;
        }

        Ok(requests.len())
    }

    /// Abort the pending reconnect timer, if any
    pub(crate) fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(
                "[Dhan WS] Cancelled reconnect attempt {} ({:?})",
                pending.attempt, pending.delay
            );
            pending.timer.abort();
        }
    }

    /// Cancel timers and close the socket with `code`
    pub(crate) fn teardown(&mut self, code: u16, reason: &str) {
        self.cancel_pending();
        self.open = false;
        if let Some(socket) = self.socket.take() {
            // The task may already be gone after a remote close
            let _ = socket.close(code, reason);
        }
    }
}

// =============================================================================
// Socket lifecycle
// =============================================================================

fn current<'a>(
    connections: &'a mut HashMap<String, UserConnection>,
    user_id: &str,
    generation: u64,
) -> Option<&'a mut UserConnection> {
    connections
        .get_mut(user_id)
        .filter(|conn| conn.generation == generation)
}

impl RegistryInner {
    /// Open a socket for `params`, replacing any existing one
    pub(crate) fn open_user(self: &Arc<Self>, params: ConnectionParams) -> Result<SubscriptionSummary> {
        self.ensure_running()?;
        params.validate()?;

        let ConnectionParams {
            user_id,
            credentials,
            security_ids,
        } = params;

        let (subscriptions, dropped) =
            SubscriptionSet::with_cap(security_ids, self.settings.max_instruments);
        if dropped > 0 {
            warn!(
                "[Dhan WS] User {} follows {} instruments over the {} per-socket limit, skipping them",
                user_id, dropped, self.settings.max_instruments
            );
        }
        let subscribed_count = subscriptions.len();

        let generation = self.next_generation();
        let request = self.connect_request(&user_id, generation, &credentials);
        debug!(
            "[Dhan WS] Connecting to: {}",
            redact_feed_url(&self.settings.feed_url, &credentials)
        );

        let mut connections = self.connections.lock();
        if let Some(mut previous) = connections.remove(&user_id) {
            info!(
                "[Dhan WS] Replacing feed for user {} (generation {})",
                user_id, previous.generation
            );
            previous.teardown(close_code::NORMAL, "replaced");
            self.prices.purge_user(&user_id);
        }

        let (socket, socket_events) = self.connector.connect(request);
        connections.insert(
            user_id.clone(),
            UserConnection::new(generation, credentials, subscriptions, socket),
        );
        drop(connections);

        info!(
            "[Dhan WS] Opening feed for user {} ({} instruments, generation {})",
            user_id, subscribed_count, generation
        );
        self.spawn_pump(user_id.clone(), generation, socket_events);

        Ok(SubscriptionSummary {
            user_id,
            subscribed_count,
            generation,
        })
    }

    /// Forward one socket's events to the handlers, in socket order
    pub(crate) fn spawn_pump(
        self: &Arc<Self>,
        user_id: String,
        generation: u64,
        mut socket_events: SocketEvents,
    ) {
        let registry = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(event) = socket_events.recv().await {
                let Some(registry) = registry.upgrade() else {
                    break;
                };

                match event {
                    SocketEvent::Opened => registry.on_open(&user_id, generation),
                    SocketEvent::Message(message) => {
                        registry.on_message(&user_id, generation, &message)
                    }
                    SocketEvent::Error(error) => registry.on_error(&user_id, generation, &error),
                    SocketEvent::Closed { code, reason } => {
                        registry.on_close(&user_id, generation, code, &reason)
                    }
                }
            }
            debug!("[Dhan WS] Event pump for user {} generation {} finished", user_id, generation);
        });
    }

    fn on_open(&self, user_id: &str, generation: u64) {
        let mut connections = self.connections.lock();
        let Some(conn) = current(&mut connections, user_id, generation) else {
            debug!("[Dhan WS] Ignoring open of stale socket for user {}", user_id);
            return;
        };

        conn.open = true;
        conn.reconnect_attempts = 0;
        conn.cancel_pending();

        match conn.send_subscriptions(self.settings.batch_size) {
            Ok(requests) => info!(
                "[Dhan WS] User {} connected, subscribed to {} instruments in {} requests",
                user_id,
                conn.subscriptions.len(),
                requests
            ),
            Err(e) => warn!("[Dhan WS] Failed to subscribe for user {}: {}", user_id, e),
        }

        self.emit(FeedEvent::Connected {
            user_id: user_id.to_string(),
            generation,
        });
    }

    fn on_message(&self, user_id: &str, generation: u64, message: &WsMessage) {
        let Some(tick) = self.decoder.decode_message(message) else {
            return;
        };

        // Cache writes happen under the connection lock so a purge cannot
        // interleave with them
        let connections = self.connections.lock();
        let accepted = connections.get(user_id).is_some_and(|conn| {
            conn.generation == generation
                && conn.open
                && conn.subscriptions.contains(&tick.security_id)
        });

        if accepted {
            self.prices.update(user_id, tick);
        } else {
            debug!(
                "[Dhan WS] Discarding tick for {} on user {}",
                tick.security_id, user_id
            );
        }
    }

    fn on_error(self: &Arc<Self>, user_id: &str, generation: u64, error: &str) {
        let mut connections = self.connections.lock();
        let Some(conn) = current(&mut connections, user_id, generation) else {
            return;
        };

        warn!("[Dhan WS] Socket error for user {}: {}", user_id, error);
        conn.open = false;
        self.schedule_reconnect(&mut connections, user_id, generation);
    }

    fn on_close(self: &Arc<Self>, user_id: &str, generation: u64, code: u16, reason: &str) {
        let mut connections = self.connections.lock();
        let Some(conn) = current(&mut connections, user_id, generation) else {
            debug!("[Dhan WS] Ignoring close of stale socket for user {}", user_id);
            return;
        };

        conn.open = false;
        conn.socket = None;
        let purged = self.prices.purge_user(user_id);
        info!(
            "[Dhan WS] Feed for user {} closed with code {} ({}), purged {} prices",
            user_id, code, reason, purged
        );
        self.emit(FeedEvent::Disconnected {
            user_id: user_id.to_string(),
            code,
        });

        if code == close_code::NORMAL {
            if let Some(mut conn) = connections.remove(user_id) {
                conn.cancel_pending();
            }
            self.emit(FeedEvent::Removed {
                user_id: user_id.to_string(),
            });
        } else {
            self.schedule_reconnect(&mut connections, user_id, generation);
        }
    }
}
