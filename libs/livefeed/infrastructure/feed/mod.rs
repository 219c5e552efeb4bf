//! Per-user feed sockets, reconnection and the live price cache

pub mod connection;
pub mod events;
pub mod price_cache;
pub mod registry;
pub mod subscription_set;
pub mod supervisor;

pub use connection::{ConnectRequest, ConnectionParams, FeedConnector, TungsteniteConnector};
pub use events::FeedEvent;
pub use price_cache::PriceCache;
pub use registry::{
    ConnectionStatus, FeedRegistry, FeedRegistryBuilder, FeedSettings, SubscriptionSummary,
};
pub use subscription_set::SubscriptionSet;
pub use supervisor::{ReconnectDecision, ReconnectSupervisor};
