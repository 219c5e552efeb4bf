//! # FeedSockets core
//!
//! The socket task and everything needed to start and observe it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedsockets::{SocketBuilder, SocketEvent};
//!
//! let (handle, mut events) = SocketBuilder::new()
//!     .url("wss://feed.example.com")
//!     .connect_timeout(Duration::from_secs(10))
//!     .label("user-42")
//!     .spawn();
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SocketEvent::Opened => handle.send(WsMessage::Text("subscribe".into()))?,
//!         SocketEvent::Message(msg) => println!("{:?}", msg),
//!         SocketEvent::Error(err) => eprintln!("{}", err),
//!         SocketEvent::Closed { code, .. } => break,
//!     }
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;

// Re-export main types
pub use builder::{states, SocketBuilder};
pub use client::{close_code, SocketCommand, SocketEvent, SocketEvents, SocketHandle, Metrics};
pub use config::SocketConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new socket builder
///
/// This is a convenience function for starting the builder pattern.
pub fn builder() -> SocketBuilder<builder::states::NoUrl> {
    SocketBuilder::new()
}
