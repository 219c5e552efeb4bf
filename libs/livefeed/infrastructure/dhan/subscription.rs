//! Subscription request batching
//!
//! Dhan accepts at most 100 instruments per subscription request and 5000 per
//! socket. Requests are JSON text frames.

use crate::domain::{Instrument, SecurityId};
use crate::error::Result;
use feedsockets::WsMessage;
use serde::Serialize;

/// Request code for a ticker-mode subscription
pub const SUBSCRIBE_TICKER_REQUEST_CODE: u8 = 15;

/// Instruments per subscription request
pub const MAX_INSTRUMENTS_PER_REQUEST: usize = 100;

/// Instruments per socket
pub const MAX_INSTRUMENTS_PER_CONNECTION: usize = 5000;

/// One subscription request frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriptionRequest {
    pub request_code: u8,
    pub instrument_count: usize,
    pub instrument_list: Vec<Instrument>,
}

impl SubscriptionRequest {
    pub fn ticker(instruments: Vec<Instrument>) -> Self {
        Self {
            request_code: SUBSCRIBE_TICKER_REQUEST_CODE,
            instrument_count: instruments.len(),
            instrument_list: instruments,
        }
    }

    /// Encode as the JSON text frame sent on the socket
    pub fn to_ws_message(&self) -> Result<WsMessage> {
        Ok(WsMessage::Text(serde_json::to_string(self)?))
    }
}

/// Subscription requests for NSE equity `security_ids`, in input order
pub fn build_subscription_messages(security_ids: &[SecurityId]) -> Vec<SubscriptionRequest> {
    let instruments: Vec<Instrument> = security_ids
        .iter()
        .map(|id| Instrument::nse_equity(id.as_str()))
        .collect();
    build_subscription_messages_for(&instruments)
}

/// Subscription requests for instruments on any segment
pub fn build_subscription_messages_for(instruments: &[Instrument]) -> Vec<SubscriptionRequest> {
    build_batches(instruments, MAX_INSTRUMENTS_PER_REQUEST)
}

/// Split `instruments` into consecutive requests of at most `batch_size`
///
/// `batch_size` is clamped to `1..=MAX_INSTRUMENTS_PER_REQUEST`.
pub fn build_batches(instruments: &[Instrument], batch_size: usize) -> Vec<SubscriptionRequest> {
    let batch_size = batch_size.clamp(1, MAX_INSTRUMENTS_PER_REQUEST);
    instruments
        .chunks(batch_size)
        .map(|chunk| SubscriptionRequest::ticker(chunk.to_vec()))
        .collect()
}
