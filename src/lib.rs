//! Dhan Live Feed - Main Library
//!
//! Hosts the HTTP control surface over the live feed registry.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **http**: axum routes for subscribing users and reading live prices
//! - **livefeed**: Feed registry, Dhan wire format, config (re-exported from workspace)
//! - **feedsockets**: WebSocket transport (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use dhan_livefeed::bin_common::{load_config_from_env, ConfigType};
//! use dhan_livefeed::livefeed::{FeedRegistry, LiveFeedConfig};
//! ```

// Re-export workspace libraries for convenience
pub use feedsockets;
pub use livefeed;

pub mod http;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables
    //!
    //! Provides shared functionality for the presentation layer (binaries).

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
