//! The long-poll loop that relays Telegram messages through the conversation.

pub mod error;
pub mod heartbeat;
pub mod runner;

pub use {
    error::{Error, Result},
    heartbeat::{DEFAULT_PROMPT, HEARTBEAT_OK, HeartbeatOutcome, HeartbeatSettings},
    runner::{CycleReport, Daemon, DaemonSettings, LoopState},
};
