//! Dhan live market-data feed
//!
//! Keeps one feed socket per user, decodes ticker frames and maintains a
//! per-user latest-price cache that is purged whenever a socket closes.
//!
//! Layout:
//! - `domain`: ticks, instruments, credentials and the collaborator lookups
//! - `infrastructure`: the Dhan wire format, the feed registry, config and logging
//! - `utils`: process helpers (shutdown)

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod utils;

pub use domain::{
    BrokerConnectionLookup, BrokerCredentials, ExchangeSegment, Instrument, InstrumentLookup,
    InstrumentRecord, SecurityId, Tick, UserId,
};
pub use error::{FeedError, Result};
pub use infrastructure::{
    dhan::{build_subscription_messages, build_subscription_messages_for, decode, FrameLayout, TickDecoder},
    feed::{ConnectionStatus, FeedEvent, FeedRegistry, FeedRegistryBuilder, SubscriptionSummary},
    init_tracing, LiveFeedConfig, StaticDirectory,
};
pub use utils::ShutdownManager;
