//! # FeedSockets Traits
//!
//! Core traits and types shared by the socket task and its owners:
//!
//! - **WsMessage**: transport-neutral text/binary payload
//! - **FrameDecoder**: turn a binary frame into a typed value
//! - **ReconnectionStrategy**: decide whether and when to reconnect
//! - **SocketError**: error type for the whole crate
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedsockets::*;
//!
//! struct LengthDecoder;
//!
//! impl FrameDecoder for LengthDecoder {
//!     type Frame = usize;
//!
//!     fn decode(&self, frame: &[u8]) -> Option<usize> {
//!         Some(frame.len())
//!     }
//! }
//! ```

pub mod error;
pub mod parser;
pub mod reconnect;

// Re-export commonly used types
pub use error::{Result, SocketError};
pub use parser::{FrameDecoder, WsMessage};
pub use reconnect::{ExponentialBackoff, NeverReconnect, ReconnectionStrategy};
