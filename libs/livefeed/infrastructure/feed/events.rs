//! Feed lifecycle events published by the registry

use std::time::Duration;

/// Observable changes in a user's feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Socket opened and subscriptions were sent
    Connected { user_id: String, generation: u64 },
    /// Socket closed; the user's prices were purged
    Disconnected { user_id: String, code: u16 },
    /// Automatic reconnect `attempt` (1-indexed) will run after `delay`
    ReconnectScheduled {
        user_id: String,
        attempt: u32,
        delay: Duration,
    },
    /// Retry budget exhausted
    GaveUp { user_id: String, attempts: u32 },
    /// Connection state dropped from the registry
    Removed { user_id: String },
}

impl FeedEvent {
    pub fn user_id(&self) -> &str {
        match self {
            FeedEvent::Connected { user_id, .. }
            | FeedEvent::Disconnected { user_id, .. }
            | FeedEvent::ReconnectScheduled { user_id, .. }
            | FeedEvent::GaveUp { user_id, .. }
            | FeedEvent::Removed { user_id } => user_id,
        }
    }
}
