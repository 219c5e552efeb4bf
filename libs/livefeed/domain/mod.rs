//! Domain Layer
//!
//! Ticks, instruments and broker credentials, plus the lookups through which
//! the feed reaches user data it does not own.

pub mod instrument;
pub mod lookup;
pub mod tick;

pub use instrument::{BrokerCredentials, ExchangeSegment, Instrument, InstrumentRecord};
pub use lookup::{BrokerConnectionLookup, InstrumentLookup};
pub use tick::{round_price, SecurityId, Tick, UserId};
