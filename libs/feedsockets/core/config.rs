use std::time::Duration;

/// Configuration for a single socket
///
/// Built by [`SocketBuilder`](crate::SocketBuilder); the URL is guaranteed
/// to be present by the builder's type state.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Upper bound on the TCP/TLS handshake plus WebSocket upgrade
    pub(crate) connect_timeout: Option<Duration>,

    /// Label used in log lines, never contains credentials
    pub(crate) label: String,
}

impl SocketConfig {
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the configured connect timeout
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Get the log label
    pub fn label(&self) -> &str {
        &self.label
    }
}
