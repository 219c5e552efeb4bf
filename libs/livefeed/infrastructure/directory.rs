//! Static account directory
//!
//! Serves broker credentials and instrument lists from a YAML file:
//!
//! ```yaml
//! accounts:
//!   - user_id: "user-1"
//!     client_id: "1000123"
//!     access_token: "${DHAN_ACCESS_TOKEN_USER_1}"
//!     instruments: ["1333", "11536"]
//! ```
//!
//! Values written as `${VAR}` are read from the environment (after loading
//! `.env`) when the file is loaded.

use super::config::{ConfigError, Result as ConfigResult};
use crate::domain::{BrokerConnectionLookup, BrokerCredentials, InstrumentLookup, InstrumentRecord};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountEntry {
    pub user_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<AccountEntry>,
}

/// In-memory directory of accounts
#[derive(Debug, Default)]
pub struct StaticDirectory {
    accounts: RwLock<HashMap<String, AccountEntry>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load accounts from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let yaml_content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> ConfigResult<Self> {
        dotenv::dotenv().ok();

        let file: AccountsFile = serde_yaml::from_str(yaml_content)?;
        let directory = Self::new();

        for mut entry in file.accounts {
            if entry.user_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "account user_id cannot be empty".to_string(),
                ));
            }
            entry.client_id = entry.client_id.map(|v| resolve_env(&v)).transpose()?;
            entry.access_token = entry.access_token.map(|v| resolve_env(&v)).transpose()?;
            directory.upsert(entry);
        }

        info!("Loaded {} accounts", directory.len());
        Ok(directory)
    }

    /// Insert or replace an account
    pub fn upsert(&self, entry: AccountEntry) {
        self.accounts.write().insert(entry.user_id.clone(), entry);
    }

    /// Replace a user's access token; returns false for unknown users
    ///
    /// Takes effect on the user's next subscription request.
    pub fn set_access_token(&self, user_id: &str, access_token: impl Into<String>) -> bool {
        match self.accounts.write().get_mut(user_id) {
            Some(entry) => {
                entry.access_token = Some(access_token.into());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, user_id: &str) -> Option<AccountEntry> {
        self.accounts.write().remove(user_id)
    }

    /// Known user ids, sorted
    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.accounts.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

/// Expand a `${VAR}` reference, leaving plain values untouched
fn resolve_env(value: &str) -> ConfigResult<String> {
    match value
        .trim()
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => std::env::var(var).map_err(|_| ConfigError::EnvVarMissing(var.to_string())),
        None => Ok(value.to_string()),
    }
}

#[async_trait]
impl BrokerConnectionLookup for StaticDirectory {
    async fn broker_connection(&self, user_id: &str) -> Result<Option<BrokerCredentials>> {
        let accounts = self.accounts.read();
        Ok(accounts.get(user_id).map(|entry| {
            BrokerCredentials::new(
                entry.access_token.clone().unwrap_or_default(),
                entry.client_id.clone().unwrap_or_default(),
            )
        }))
    }
}

#[async_trait]
impl InstrumentLookup for StaticDirectory {
    async fn instruments(&self, user_id: &str) -> Result<Vec<InstrumentRecord>> {
        let accounts = self.accounts.read();
        Ok(accounts
            .get(user_id)
            .map(|entry| {
                entry
                    .instruments
                    .iter()
                    .map(|id| InstrumentRecord::new(id.as_str()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
