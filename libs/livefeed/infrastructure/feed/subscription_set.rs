//! Ordered, de-duplicated set of instruments owned by one socket

use crate::domain::SecurityId;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    ordered: Vec<SecurityId>,
    members: HashSet<SecurityId>,
}

impl SubscriptionSet {
    /// Build from `ids`, keeping first occurrences and at most `cap` entries
    ///
    /// Returns the set and the number of distinct ids left out by the cap.
    pub fn with_cap(ids: impl IntoIterator<Item = SecurityId>, cap: usize) -> (Self, usize) {
        let mut set = Self::default();
        let mut overflow = HashSet::new();

        for id in ids {
            let id = id.trim().to_string();
            if id.is_empty() || set.members.contains(&id) {
                continue;
            }
            if set.ordered.len() < cap {
                set.members.insert(id.clone());
                set.ordered.push(id);
            } else {
                overflow.insert(id);
            }
        }

        (set, overflow.len())
    }

    pub fn contains(&self, security_id: &str) -> bool {
        self.members.contains(security_id)
    }

    pub fn ids(&self) -> &[SecurityId] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
