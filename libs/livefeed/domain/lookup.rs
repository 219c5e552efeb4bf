//! Collaborator lookups
//!
//! The feed never owns user data. Credentials and instrument lists are
//! fetched through these traits every time a socket is (re)initialized.

use super::instrument::{BrokerCredentials, InstrumentRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Resolves a user's broker connection
#[async_trait]
pub trait BrokerConnectionLookup: Send + Sync {
    /// `Ok(None)` when the user has no broker connection
    async fn broker_connection(&self, user_id: &str) -> Result<Option<BrokerCredentials>>;
}

/// Resolves the instruments a user follows
#[async_trait]
pub trait InstrumentLookup: Send + Sync {
    async fn instruments(&self, user_id: &str) -> Result<Vec<InstrumentRecord>>;
}
