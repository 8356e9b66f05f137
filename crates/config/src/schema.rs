use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model used when `[model] name` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Typed view of `config.toml`. Every section is optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorphishConfig {
    /// The one Telegram chat the daemon serves. Absent until bootstrap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    pub model: ModelConfig,
    pub heartbeat: HeartbeatConfig,
    pub daemon: DaemonConfig,
    pub google_chat: GoogleChatConfig,
}

impl CorphishConfig {
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.chat_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model id sent to the provider.
    pub name: String,
    pub max_tokens: u32,
    /// Override for the Anthropic API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.into(),
            max_tokens: 4096,
            base_url: None,
        }
    }
}

/// Periodic unsolicited check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Minutes between heartbeats. Unset or zero disables the heartbeat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u64>,
    /// Skip a heartbeat while a user message is being answered.
    pub idle_only: bool,
    /// Prompt override; the built-in heartbeat prompt is used when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_minutes: None,
            idle_only: true,
            prompt: None,
        }
    }
}

impl HeartbeatConfig {
    /// Effective interval, `None` when disabled.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.interval_minutes
            .filter(|m| *m > 0)
            .map(|m| Duration::from_secs(m * 60))
    }
}

/// Poll loop cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Long-poll timeout handed to the channel.
    pub poll_timeout_secs: u32,
    /// Sleep after an empty poll.
    pub idle_sleep_secs: u64,
    /// Submit at most this many recent turns per model call. Unset sends
    /// the whole history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_turns: Option<usize>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 10,
            idle_sleep_secs: 1,
            history_turns: None,
        }
    }
}

impl DaemonConfig {
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.poll_timeout_secs))
    }

    #[must_use]
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_secs(self.idle_sleep_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GoogleChatConfig {
    /// Space resource name, e.g. `spaces/AAAA1234`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
}
