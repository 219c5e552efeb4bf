//! Feed error types

use feedsockets::SocketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("No broker connection found for user {0}")]
    MissingCredentials(String),

    #[error("Broker connection for user {user_id} has no {field}")]
    IncompleteCredentials { user_id: String, field: &'static str },

    #[error("No instruments found for user {0}")]
    NoInstruments(String),

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Failed to encode subscription request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Feed registry is shut down")]
    ShutDown,
}

impl FeedError {
    /// True for failures caused by the user's own data (no socket was opened)
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FeedError::MissingCredentials(_)
                | FeedError::IncompleteCredentials { .. }
                | FeedError::NoInstruments(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(FeedError::MissingCredentials("u1".into()).is_precondition());
        assert!(FeedError::IncompleteCredentials {
            user_id: "u1".into(),
            field: "client id"
        }
        .is_precondition());
        assert!(FeedError::NoInstruments("u1".into()).is_precondition());
        assert!(!FeedError::Lookup("db down".into()).is_precondition());
        assert!(!FeedError::ShutDown.is_precondition());
    }

    #[test]
    fn test_messages_name_the_user() {
        let err = FeedError::IncompleteCredentials {
            user_id: "u7".into(),
            field: "access token",
        };
        assert_eq!(err.to_string(), "Broker connection for user u7 has no access token");
    }
}
