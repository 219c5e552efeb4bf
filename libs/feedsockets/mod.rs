//! # FeedSockets
//!
//! A small WebSocket transport for market-data feeds.
//!
//! Each socket runs in its own tokio task and reports its lifecycle as a
//! stream of [`SocketEvent`]s (`Opened`, `Message`, `Error`, `Closed`).
//! The transport never reconnects by itself: the owner of the event stream
//! decides what to do on failure, usually with a [`ReconnectionStrategy`].
//!
//! ## Features
//!
//! - **Type-state builder**: the URL must be set before a socket can be spawned
//! - **Lifecycle events**: open/message/error/close delivered in socket order
//! - **Automatic pong**: server PING frames are answered inside the socket task
//! - **Pluggable policies**: reconnection strategies and binary frame decoders

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core socket functionality
pub use self::core::{
    builder, client, config, connection_state,
    builder::{states, SocketBuilder},
    client::{close_code, Metrics, SocketCommand, SocketEvent, SocketEvents, SocketHandle},
    config::SocketConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
};

/// Type alias for Result with SocketError
pub type Result<T> = std::result::Result<T, traits::SocketError>;
