//! Instruments, exchange segments and broker credentials

use super::tick::SecurityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dhan exchange segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExchangeSegment {
    #[serde(rename = "IDX_I")]
    Index,
    #[default]
    #[serde(rename = "NSE_EQ")]
    NseEquity,
    #[serde(rename = "NSE_FNO")]
    NseDerivatives,
    #[serde(rename = "NSE_CURRENCY")]
    NseCurrency,
    #[serde(rename = "BSE_EQ")]
    BseEquity,
    #[serde(rename = "BSE_FNO")]
    BseDerivatives,
    #[serde(rename = "BSE_CURRENCY")]
    BseCurrency,
    #[serde(rename = "MCX_COMM")]
    McxCommodity,
}

impl ExchangeSegment {
    /// Wire name used in subscription requests
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeSegment::Index => "IDX_I",
            ExchangeSegment::NseEquity => "NSE_EQ",
            ExchangeSegment::NseDerivatives => "NSE_FNO",
            ExchangeSegment::NseCurrency => "NSE_CURRENCY",
            ExchangeSegment::BseEquity => "BSE_EQ",
            ExchangeSegment::BseDerivatives => "BSE_FNO",
            ExchangeSegment::BseCurrency => "BSE_CURRENCY",
            ExchangeSegment::McxCommodity => "MCX_COMM",
        }
    }
}

impl fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a subscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instrument {
    pub exchange_segment: ExchangeSegment,
    pub security_id: SecurityId,
}

impl Instrument {
    /// An NSE equity instrument
    pub fn nse_equity(security_id: impl Into<SecurityId>) -> Self {
        Self {
            exchange_segment: ExchangeSegment::NseEquity,
            security_id: security_id.into(),
        }
    }
}

/// Instrument row returned by the instrument lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub security_id: SecurityId,
}

impl InstrumentRecord {
    pub fn new(security_id: impl Into<SecurityId>) -> Self {
        Self {
            security_id: security_id.into(),
        }
    }
}

/// Credentials needed to open a user's feed socket
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub access_token: String,
    pub client_id: String,
}

impl BrokerCredentials {
    pub fn new(access_token: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            client_id: client_id.into(),
        }
    }

    /// Name of the first missing field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.access_token.trim().is_empty() {
            Some("access token")
        } else if self.client_id.trim().is_empty() {
            Some("client id")
        } else {
            None
        }
    }
}

// The token never reaches logs through Debug
impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("access_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_wire_format() {
        let json = serde_json::to_value(Instrument::nse_equity("1333")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ExchangeSegment": "NSE_EQ", "SecurityId": "1333"})
        );
    }

    #[test]
    fn test_segment_names_match_serde() {
        for segment in [
            ExchangeSegment::Index,
            ExchangeSegment::NseEquity,
            ExchangeSegment::NseDerivatives,
            ExchangeSegment::McxCommodity,
        ] {
            let json = serde_json::to_value(segment).unwrap();
            assert_eq!(json, segment.as_str());
        }
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(BrokerCredentials::new("tok", "c1").missing_field(), None);
        assert_eq!(
            BrokerCredentials::new("", "c1").missing_field(),
            Some("access token")
        );
        assert_eq!(BrokerCredentials::new("tok", " ").missing_field(), Some("client id"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = BrokerCredentials::new("secret-token", "c1");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("c1"));
    }
}
