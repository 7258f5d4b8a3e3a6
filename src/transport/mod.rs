//! Transport module - the byte stream shared with the host runtime.
//!
//! Provides:
//! - [`Relay`] - send/receive whole frames
//! - [`StreamRelay`] - a relay over any async read/write pair
//! - [`RelayAddress`] - `pipes`, `unix://...` or `tcp://...`

mod address;
mod relay;

pub use address::RelayAddress;
pub use relay::{DynRelay, Relay, StreamRelay};
