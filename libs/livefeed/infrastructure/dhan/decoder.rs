//! Binary ticker frame decoder
//!
//! A ticker frame (feed version 2) is laid out little-endian as:
//!
//! | offset | size | field                |
//! |--------|------|----------------------|
//! | 0      | 1    | header byte          |
//! | 1      | 1    | feed response code   |
//! | 5      | 4    | security id (i32)    |
//! | 9      | 4    | last traded price (f32) |
//! | 13     | 4    | last trade time (i32 epoch seconds) |
//!
//! Frames shorter than the layout, or carrying any other feed response code,
//! are not ticks and decode to `None` without logging.

use crate::domain::Tick;
use chrono::{DateTime, Utc};
use feedsockets::FrameDecoder;
use thiserror::Error;
use tracing::warn;

// =============================================================================
// Frame Layout
// =============================================================================

/// Byte positions of the ticker fields for one feed version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub version: u8,
    pub feed_code_offset: usize,
    pub security_id_offset: usize,
    pub price_offset: usize,
    pub trade_time_offset: usize,
    /// Smallest frame that holds every field
    pub min_len: usize,
    /// Feed response code of a ticker packet
    pub ticker_code: u8,
}

impl FrameLayout {
    pub const V2: FrameLayout = FrameLayout {
        version: 2,
        feed_code_offset: 1,
        security_id_offset: 5,
        price_offset: 9,
        trade_time_offset: 13,
        min_len: 17,
        ticker_code: 2,
    };
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::V2
    }
}

// =============================================================================
// Decoder
// =============================================================================

#[derive(Error, Debug, PartialEq)]
enum DecodeError {
    #[error("field at offset {offset} runs past frame of {len} bytes")]
    Truncated { offset: usize, len: usize },

    #[error("non-finite price {0}")]
    NonFinitePrice(f32),

    #[error("trade time {0} out of range")]
    InvalidTradeTime(i32),
}

/// Decodes ticker frames laid out per a [`FrameLayout`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TickDecoder {
    layout: FrameLayout,
}

impl TickDecoder {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    fn parse_ticker(&self, frame: &[u8]) -> Result<Tick, DecodeError> {
        let security_id = read_i32_le(frame, self.layout.security_id_offset)?;
        let price = read_f32_le(frame, self.layout.price_offset)?;
        let trade_time = read_i32_le(frame, self.layout.trade_time_offset)?;

        if !price.is_finite() {
            return Err(DecodeError::NonFinitePrice(price));
        }

        let time: DateTime<Utc> = DateTime::from_timestamp(i64::from(trade_time), 0)
            .ok_or(DecodeError::InvalidTradeTime(trade_time))?;

        Ok(Tick::new(security_id.to_string(), f64::from(price), time))
    }
}

impl FrameDecoder for TickDecoder {
    type Frame = Tick;

    fn decode(&self, frame: &[u8]) -> Option<Tick> {
        if frame.len() < self.layout.min_len {
            return None;
        }

        if frame.get(self.layout.feed_code_offset) != Some(&self.layout.ticker_code) {
            return None;
        }

        match self.parse_ticker(frame) {
            Ok(tick) => Some(tick),
            Err(e) => {
                warn!("[Dhan Decoder] Dropping ticker frame: {}", e);
                None
            }
        }
    }
}

/// Decode a frame with the current feed layout
pub fn decode(frame: &[u8]) -> Option<Tick> {
    TickDecoder::default().decode(frame)
}

fn field<const N: usize>(frame: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    frame
        .get(offset..offset + N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(DecodeError::Truncated {
            offset,
            len: frame.len(),
        })
}

fn read_i32_le(frame: &[u8], offset: usize) -> Result<i32, DecodeError> {
    field::<4>(frame, offset).map(i32::from_le_bytes)
}

fn read_f32_le(frame: &[u8], offset: usize) -> Result<f32, DecodeError> {
    field::<4>(frame, offset).map(f32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsockets::WsMessage;

    fn ticker_frame(code: u8, security_id: i32, price: f32, time: i32) -> Vec<u8> {
        let mut frame = vec![0u8; 17];
        frame[0] = 0x01;
        frame[1] = code;
        frame[5..9].copy_from_slice(&security_id.to_le_bytes());
        frame[9..13].copy_from_slice(&price.to_le_bytes());
        frame[13..17].copy_from_slice(&time.to_le_bytes());
        frame
    }

    #[test]
    fn test_short_frames_are_ignored() {
        let full = ticker_frame(2, 1333, 100.0, 1_700_000_000);
        for len in 0..17 {
            assert_eq!(decode(&full[..len]), None, "len {}", len);
        }
    }

    #[test]
    fn test_ticker_decodes() {
        let tick = decode(&ticker_frame(2, 1333, 1520.257, 1_700_000_000)).unwrap();

        assert_eq!(tick.security_id, "1333");
        assert_eq!(tick.last_traded_price, 1520.26);
        assert_eq!(tick.last_trade_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_price_rounded_to_two_decimals() {
        for (raw, expected) in [(123.45f32, 123.45), (99.999, 100.0), (0.004, 0.0), (7.125, 7.13)] {
            let tick = decode(&ticker_frame(2, 1, raw, 0)).unwrap();
            assert_eq!(tick.last_traded_price, expected, "raw {}", raw);
        }
    }

    #[test]
    fn test_other_feed_codes_are_ignored() {
        for code in (0..=u8::MAX).filter(|c| *c != 2) {
            assert_eq!(decode(&ticker_frame(code, 1333, 10.0, 0)), None, "code {}", code);
        }
    }

    #[test]
    fn test_longer_frames_decode() {
        let mut frame = ticker_frame(2, 42, 10.5, 0);
        frame.extend_from_slice(&[0xff; 8]);
        assert_eq!(decode(&frame).unwrap().security_id, "42");
    }

    #[test]
    fn test_non_finite_price_is_dropped() {
        assert_eq!(decode(&ticker_frame(2, 1, f32::NAN, 0)), None);
        assert_eq!(decode(&ticker_frame(2, 1, f32::INFINITY, 0)), None);
    }

    #[test]
    fn test_negative_ids_and_times() {
        let tick = decode(&ticker_frame(2, -5, 1.0, -60)).unwrap();
        assert_eq!(tick.security_id, "-5");
        assert_eq!(tick.last_trade_time.timestamp(), -60);
    }

    #[test]
    fn test_decode_message_skips_text() {
        let decoder = TickDecoder::new(FrameLayout::V2);
        let frame = ticker_frame(2, 7, 3.0, 0);

        assert!(decoder.decode_message(&WsMessage::Binary(frame)).is_some());
        assert!(decoder
            .decode_message(&WsMessage::Text("{\"type\":\"ack\"}".into()))
            .is_none());
    }

    #[test]
    fn test_truncated_field_error() {
        assert_eq!(
            read_i32_le(&[0u8; 6], 5),
            Err(DecodeError::Truncated { offset: 5, len: 6 })
        );
    }
}
