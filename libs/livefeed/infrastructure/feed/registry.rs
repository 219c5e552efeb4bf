//! Connection registry
//!
//! Owns every user's connection state and the price cache. All mutation goes
//! through one mutex over the connection map; no lock is held across an
//! `.await`.

use super::connection::{
    ConnectRequest, ConnectionParams, FeedConnector, TungsteniteConnector, UserConnection,
};
use super::events::FeedEvent;
use super::price_cache::PriceCache;
use super::supervisor::ReconnectSupervisor;
use crate::domain::{BrokerConnectionLookup, BrokerCredentials, InstrumentLookup, Tick};
use crate::error::{FeedError, Result};
use crate::infrastructure::config::LiveFeedConfig;
use crate::infrastructure::dhan::{
    build_feed_url, FrameLayout, TickDecoder, DHAN_FEED_URL, MAX_INSTRUMENTS_PER_CONNECTION,
    MAX_INSTRUMENTS_PER_REQUEST,
};
use feedsockets::close_code;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

const DEFAULT_EVENT_CAPACITY: usize = 256;

// =============================================================================
// Settings and snapshots
// =============================================================================

/// Tunables applied to every socket
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub feed_url: String,
    pub connect_timeout: Option<Duration>,
    pub batch_size: usize,
    pub max_instruments: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            feed_url: DHAN_FEED_URL.to_string(),
            connect_timeout: Some(Duration::from_secs(10)),
            batch_size: MAX_INSTRUMENTS_PER_REQUEST,
            max_instruments: MAX_INSTRUMENTS_PER_CONNECTION,
        }
    }
}

impl From<&LiveFeedConfig> for FeedSettings {
    fn from(config: &LiveFeedConfig) -> Self {
        Self {
            feed_url: config.feed.url.clone(),
            connect_timeout: config.feed.connect_timeout(),
            batch_size: config.subscription.batch_size,
            max_instruments: config.subscription.max_instruments,
        }
    }
}

/// Result of a successful subscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub user_id: String,
    pub subscribed_count: usize,
    pub generation: u64,
}

/// Diagnostic snapshot of one user's connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub user_id: String,
    pub generation: u64,
    pub open: bool,
    pub subscribed_count: usize,
    pub reconnect_attempts: u32,
    pub reconnect_pending: bool,
    pub cached_prices: usize,
}

// =============================================================================
// Shared state
// =============================================================================

pub(crate) struct RegistryInner {
    pub(crate) settings: FeedSettings,
    pub(crate) supervisor: ReconnectSupervisor,
    pub(crate) connector: Arc<dyn FeedConnector>,
    pub(crate) decoder: TickDecoder,
    pub(crate) connections: Mutex<HashMap<String, UserConnection>>,
    pub(crate) prices: PriceCache,
    next_generation: AtomicU64,
    events: broadcast::Sender<FeedEvent>,
    shut_down: AtomicBool,
}

impl RegistryInner {
    pub(crate) fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn connect_request(
        &self,
        user_id: &str,
        generation: u64,
        credentials: &BrokerCredentials,
    ) -> ConnectRequest {
        ConnectRequest {
            user_id: user_id.to_string(),
            generation,
            url: build_feed_url(&self.settings.feed_url, credentials),
            connect_timeout: self.settings.connect_timeout,
        }
    }

    pub(crate) fn emit(&self, event: FeedEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(FeedError::ShutDown);
        }
        Ok(())
    }

    /// Close and forget `user_id`'s connection, purging its prices
    fn remove_user(&self, user_id: &str, reason: &str) -> bool {
        let mut connections = self.connections.lock();
        let removed = match connections.remove(user_id) {
            Some(mut conn) => {
                conn.teardown(close_code::NORMAL, reason);
                true
            }
            None => false,
        };
        self.prices.purge_user(user_id);
        drop(connections);

        if removed {
            self.emit(FeedEvent::Removed {
                user_id: user_id.to_string(),
            });
        }
        removed
    }

    fn status_of(&self, user_id: &str, conn: &UserConnection) -> ConnectionStatus {
        ConnectionStatus {
            user_id: user_id.to_string(),
            generation: conn.generation,
            open: conn.open,
            subscribed_count: conn.subscriptions.len(),
            reconnect_attempts: conn.reconnect_attempts,
            reconnect_pending: conn.pending.is_some(),
            cached_prices: self.prices.len_for(user_id),
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`FeedRegistry`]
pub struct FeedRegistryBuilder {
    credentials: Arc<dyn BrokerConnectionLookup>,
    instruments: Arc<dyn InstrumentLookup>,
    settings: FeedSettings,
    supervisor: ReconnectSupervisor,
    connector: Arc<dyn FeedConnector>,
    layout: FrameLayout,
    event_capacity: usize,
}

impl FeedRegistryBuilder {
    pub fn new(
        credentials: Arc<dyn BrokerConnectionLookup>,
        instruments: Arc<dyn InstrumentLookup>,
    ) -> Self {
        Self {
            credentials,
            instruments,
            settings: FeedSettings::default(),
            supervisor: ReconnectSupervisor::default(),
            connector: Arc::new(TungsteniteConnector),
            layout: FrameLayout::V2,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Take feed settings and the reconnect policy from `config`
    pub fn config(mut self, config: &LiveFeedConfig) -> Self {
        self.settings = FeedSettings::from(config);
        self.supervisor = ReconnectSupervisor::from_config(&config.reconnect);
        self
    }

    pub fn settings(mut self, settings: FeedSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn supervisor(mut self, supervisor: ReconnectSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn connector(mut self, connector: impl FeedConnector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> FeedRegistry {
        let (events, _) = broadcast::channel(self.event_capacity);

        let inner = RegistryInner {
            settings: self.settings,
            supervisor: self.supervisor,
            connector: self.connector,
            decoder: TickDecoder::new(self.layout),
            connections: Mutex::new(HashMap::new()),
            prices: PriceCache::new(),
            next_generation: AtomicU64::new(0),
            events,
            shut_down: AtomicBool::new(false),
        };

        FeedRegistry {
            inner: Arc::new(inner),
            credentials: self.credentials,
            instruments: self.instruments,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Per-user feed sockets and their latest prices
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct FeedRegistry {
    inner: Arc<RegistryInner>,
    credentials: Arc<dyn BrokerConnectionLookup>,
    instruments: Arc<dyn InstrumentLookup>,
}

impl FeedRegistry {
    pub fn builder(
        credentials: Arc<dyn BrokerConnectionLookup>,
        instruments: Arc<dyn InstrumentLookup>,
    ) -> FeedRegistryBuilder {
        FeedRegistryBuilder::new(credentials, instruments)
    }

    /// Registry dialing the broker with settings from `config`
    pub fn from_config(
        config: &LiveFeedConfig,
        credentials: Arc<dyn BrokerConnectionLookup>,
        instruments: Arc<dyn InstrumentLookup>,
    ) -> Self {
        Self::builder(credentials, instruments).config(config).build()
    }

    /// Open (or replace) `user_id`'s socket and subscribe to their instruments
    ///
    /// Credentials and instruments are looked up fresh on every call. Any
    /// existing socket for the user is closed and their prices purged.
    pub async fn init_user_subscription(&self, user_id: &str) -> Result<SubscriptionSummary> {
        self.inner.ensure_running()?;

        let credentials = match self.credentials.broker_connection(user_id).await? {
            Some(credentials) => credentials,
            None => {
                warn!("[Dhan WS] No broker connection for user {}", user_id);
                return Err(FeedError::MissingCredentials(user_id.to_string()));
            }
        };

        let security_ids = self
            .instruments
            .instruments(user_id)
            .await?
            .into_iter()
            .map(|record| record.security_id)
            .collect();

        self.inner.open_user(ConnectionParams {
            user_id: user_id.to_string(),
            credentials,
            security_ids,
        })
    }

    /// Drop `user_id`'s current socket and start over with fresh lookups
    pub async fn reconnect_user_feed(&self, user_id: &str) -> Result<SubscriptionSummary> {
        self.inner.ensure_running()?;

        info!("[Dhan WS] Manual reconnect for user {}", user_id);
        self.inner.remove_user(user_id, "manual reconnect");
        self.init_user_subscription(user_id).await
    }

    /// Close `user_id`'s socket on purpose; returns false if there was none
    pub fn disconnect_user(&self, user_id: &str) -> bool {
        let removed = self.inner.remove_user(user_id, "disconnect requested");
        if removed {
            info!("[Dhan WS] Disconnected user {}", user_id);
        }
        removed
    }

    pub fn get_live_price(&self, user_id: &str, security_id: &str) -> Option<Tick> {
        self.inner.prices.get(user_id, security_id)
    }

    /// All cached ticks for `user_id`, ordered by security id
    pub fn get_bulk_live_prices(&self, user_id: &str) -> Vec<Tick> {
        self.inner.prices.get_all(user_id)
    }

    pub fn connection_status(&self, user_id: &str) -> Option<ConnectionStatus> {
        let connections = self.inner.connections.lock();
        connections
            .get(user_id)
            .map(|conn| self.inner.status_of(user_id, conn))
    }

    /// Snapshots of every connection, ordered by user id
    pub fn list_connections(&self) -> Vec<ConnectionStatus> {
        let connections = self.inner.connections.lock();
        let mut statuses: Vec<ConnectionStatus> = connections
            .iter()
            .map(|(user_id, conn)| self.inner.status_of(user_id, conn))
            .collect();
        statuses.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        statuses
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.events.subscribe()
    }

    /// Close every socket, cancel every timer and clear all state
    ///
    /// Later subscription requests fail with [`FeedError::ShutDown`].
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut connections = self.inner.connections.lock();
        let count = connections.len();
        for (_, mut conn) in connections.drain() {
            conn.teardown(close_code::NORMAL, "shutdown");
        }
        self.inner.prices.clear();
        drop(connections);

        info!("[Dhan WS] Feed registry shut down ({} connections closed)", count);
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_shut_down()
    }
}
