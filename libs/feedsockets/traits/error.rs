use thiserror::Error;

/// Main error type for feedsockets
#[derive(Error, Debug)]
pub enum SocketError {
    /// WebSocket protocol or I/O error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The socket task is gone, commands can no longer be delivered
    #[error("Socket task unavailable: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for feedsockets operations
pub type Result<T> = std::result::Result<T, SocketError>;
