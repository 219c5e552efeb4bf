//! Infrastructure Layer
//!
//! Wire format, socket management, configuration and the static account
//! directory. Depends on the domain layer.

pub mod config;
pub mod dhan;
pub mod directory;
pub mod feed;
pub mod logging;

pub use config::{ConfigError, LiveFeedConfig};
pub use directory::{AccountEntry, StaticDirectory};
pub use feed::{FeedEvent, FeedRegistry};
pub use logging::init_tracing;
