//! Periodic unsolicited check-in with the model.

use std::time::Duration;

use corphish_config::HeartbeatConfig;

/// Reply meaning "nothing to report". Never relayed.
pub const HEARTBEAT_OK: &str = "HEARTBEAT_OK";

pub const DEFAULT_PROMPT: &str = "\
This is a periodic heartbeat check. Review the conversation so far and decide \
whether anything needs the user's attention right now.\n\n\
- If nothing requires attention, reply with exactly: HEARTBEAT_OK\n\
- If something needs attention, describe it concisely.\n\
Do NOT wrap HEARTBEAT_OK in markdown formatting.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatSettings {
    pub interval: Duration,
    /// Skip the tick while a conversation turn is in flight on a task other
    /// than the poll loop. The loop itself never ticks mid-batch.
    pub idle_only: bool,
    pub prompt: String,
}

impl HeartbeatSettings {
    /// `None` when the heartbeat is disabled (no interval, or zero).
    pub fn from_config(config: &HeartbeatConfig) -> Option<Self> {
        let interval = config.interval()?;
        let prompt = config
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROMPT)
            .to_string();
        Some(Self {
            interval,
            idle_only: config.idle_only,
            prompt,
        })
    }
}

/// What a single heartbeat tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Disabled,
    SkippedBusy,
    Acknowledged,
    Relayed,
    Failed,
}

/// Whether `reply` is the sentinel, tolerating `**bold**` and `<b>` wrappers.
pub fn is_heartbeat_ok(reply: &str) -> bool {
    let trimmed = reply.trim();
    let unwrapped = trimmed
        .strip_prefix("**")
        .and_then(|s| s.strip_suffix("**"))
        .or_else(|| {
            trimmed
                .strip_prefix("<b>")
                .and_then(|s| s.strip_suffix("</b>"))
        })
        .unwrap_or(trimmed);
    unwrapped.trim() == HEARTBEAT_OK
}
