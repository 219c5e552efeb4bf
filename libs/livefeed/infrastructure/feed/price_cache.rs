//! Per-user latest-price cache

use crate::domain::Tick;
use parking_lot::RwLock;
use std::collections::HashMap;

/// `(user, security id) -> latest tick`
///
/// Writers are the registry's socket handlers; entries for a user only exist
/// while that user's socket is open.
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: RwLock<HashMap<String, HashMap<String, Tick>>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `(user_id, tick.security_id)`
    pub fn update(&self, user_id: &str, tick: Tick) {
        let mut entries = self.entries.write();
        entries
            .entry(user_id.to_string())
            .or_default()
            .insert(tick.security_id.clone(), tick);
    }

    pub fn get(&self, user_id: &str, security_id: &str) -> Option<Tick> {
        self.entries
            .read()
            .get(user_id)
            .and_then(|prices| prices.get(security_id))
            .cloned()
    }

    /// Every cached tick for `user_id`, ordered by security id
    pub fn get_all(&self, user_id: &str) -> Vec<Tick> {
        let mut ticks: Vec<Tick> = self
            .entries
            .read()
            .get(user_id)
            .map(|prices| prices.values().cloned().collect())
            .unwrap_or_default();
        ticks.sort_by(|a, b| a.security_id.cmp(&b.security_id));
        ticks
    }

    /// Drop every entry for `user_id`, returning how many were removed
    pub fn purge_user(&self, user_id: &str) -> usize {
        self.entries
            .write()
            .remove(user_id)
            .map(|prices| prices.len())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached ticks for `user_id`
    pub fn len_for(&self, user_id: &str) -> usize {
        self.entries.read().get(user_id).map_or(0, HashMap::len)
    }

    /// Total number of cached ticks
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
