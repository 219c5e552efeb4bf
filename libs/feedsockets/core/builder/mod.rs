pub mod states;

use crate::client::{spawn_socket, SocketEvents, SocketHandle};
use crate::config::SocketConfig;
use states::*;
use std::marker::PhantomData;
use std::time::Duration;

/// Type-state builder for a feed socket
///
/// The URL must be set before [`spawn`](SocketBuilder::spawn) becomes
/// available.
pub struct SocketBuilder<U>
where
    U: UrlState,
{
    _state: PhantomData<U>,
    url: Option<String>,
    connect_timeout: Option<Duration>,
    label: Option<String>,
}

impl SocketBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
            url: None,
            connect_timeout: None,
            label: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> SocketBuilder<HasUrl> {
        SocketBuilder {
            _state: PhantomData,
            url: Some(url.into()),
            connect_timeout: self.connect_timeout,
            label: self.label,
        }
    }
}

impl Default for SocketBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> SocketBuilder<U>
where
    U: UrlState,
{
    /// Fail the connection attempt if the upgrade takes longer than `timeout`
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the label used in log lines
    ///
    /// Feed URLs often embed access tokens, so the URL itself is never logged.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// Spawn method - only available once the URL is set
impl SocketBuilder<HasUrl> {
    /// Build the configuration without spawning
    pub fn config(self) -> SocketConfig {
        SocketConfig {
            url: self.url.unwrap_or_default(),
            connect_timeout: self.connect_timeout,
            label: self.label.unwrap_or_else(|| "socket".to_string()),
        }
    }

    /// Spawn the socket task
    ///
    /// Must be called from within a tokio runtime. The returned event stream
    /// yields `Opened` or `Error`, then messages, and always ends with
    /// exactly one `Closed`.
    pub fn spawn(self) -> (SocketHandle, SocketEvents) {
        spawn_socket(self.config())
    }
}
