//! Tick - the latest trade seen for one instrument

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application user identifier
pub type UserId = String;

/// Broker instrument identifier, kept in its decimal string form
pub type SecurityId = String;

/// A decoded ticker update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub security_id: SecurityId,
    /// Rounded to 2 decimal places
    pub last_traded_price: f64,
    pub last_trade_time: DateTime<Utc>,
}

impl Tick {
    pub fn new(security_id: impl Into<SecurityId>, price: f64, time: DateTime<Utc>) -> Self {
        Self {
            security_id: security_id.into(),
            last_traded_price: round_price(price),
            last_trade_time: time,
        }
    }
}

/// Round a price to 2 decimal places
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
