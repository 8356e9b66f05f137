//! Google Chat transport: create a space and post messages into it.
//!
//! Push-only. Inbound polling is not available on this transport.

pub mod client;
pub mod error;

pub use {
    client::{DEFAULT_BASE_URL, GoogleChatChannel},
    error::{Error, Result},
};
