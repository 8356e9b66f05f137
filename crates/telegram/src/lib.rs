//! Telegram bot transport for corphish.
//!
//! Implements [`corphish_channels::Channel`] with teloxide: `getUpdates`
//! long-polling inbound and `sendMessage` outbound.

pub mod bot;
pub mod config;
pub mod markdown;

pub use {bot::TelegramChannel, config::TelegramConfig};
