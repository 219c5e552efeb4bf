//! Dhan market feed wire format
//!
//! Binary ticker frames in, JSON subscription requests out.

pub mod decoder;
pub mod subscription;

pub use decoder::{decode, FrameLayout, TickDecoder};
pub use subscription::{
    build_batches, build_subscription_messages, build_subscription_messages_for,
    SubscriptionRequest, MAX_INSTRUMENTS_PER_CONNECTION, MAX_INSTRUMENTS_PER_REQUEST,
    SUBSCRIBE_TICKER_REQUEST_CODE,
};

use crate::domain::BrokerCredentials;

/// Default Dhan live market feed endpoint
pub const DHAN_FEED_URL: &str = "wss://api-feed.dhan.co";

/// Feed protocol version requested in the handshake
pub const FEED_VERSION: u8 = FrameLayout::V2.version;

/// Authentication type for access-token login
pub const AUTH_TYPE: u8 = 2;

/// `base` with an explicit path, so the handshake request target is never empty
fn endpoint(base: &str) -> String {
    let has_path = base
        .split_once("://")
        .is_some_and(|(_, rest)| rest.contains('/'));
    if has_path {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

/// Build the handshake URL for a user's socket
///
/// The result carries the access token; log [`redact_feed_url`] instead.
pub fn build_feed_url(base: &str, credentials: &BrokerCredentials) -> String {
    format!(
        "{}?version={}&token={}&clientId={}&authType={}",
        endpoint(base),
        FEED_VERSION,
        credentials.access_token,
        credentials.client_id,
        AUTH_TYPE
    )
}

/// The handshake URL with the token masked
pub fn redact_feed_url(base: &str, credentials: &BrokerCredentials) -> String {
    format!(
        "{}?version={}&token=***&clientId={}&authType={}",
        endpoint(base),
        FEED_VERSION,
        credentials.client_id,
        AUTH_TYPE
    )
}
