//! Transport-neutral channel interface.
//!
//! Every messaging transport implements [`Channel`]: outbound `send` (validated
//! before any network call) and inbound long-poll `poll`. Push-only transports
//! report `poll` as [`Error::Unsupported`].

pub mod error;
pub mod channel;

pub use {
    error::{Error, Result},
    channel::{Channel, InboundMessage, InboundUpdate, validate_outbound},
};
