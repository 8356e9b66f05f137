use secrecy::Secret;

use crate::error::{Error, Result};

pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const TELEGRAM_HINT: &str =
    "Create a bot with @BotFather in Telegram and export the token it gives you.";
const ANTHROPIC_HINT: &str = "Get your API key from https://console.anthropic.com";

/// The two secrets the daemon cannot start without.
pub struct Secrets {
    pub telegram_bot_token: Secret<String>,
    pub anthropic_api_key: Secret<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("telegram_bot_token", &"[REDACTED]")
            .field("anthropic_api_key", &"[REDACTED]")
            .finish()
    }
}

impl Secrets {
    /// Read both secrets from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Read both secrets through `lookup`; the Telegram token is checked first.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            telegram_bot_token: telegram_bot_token(&lookup)?,
            anthropic_api_key: anthropic_api_key(&lookup)?,
        })
    }
}

/// Telegram bot token alone, for commands that never talk to the model.
pub fn telegram_bot_token(lookup: impl Fn(&str) -> Option<String>) -> Result<Secret<String>> {
    required(&lookup, TELEGRAM_BOT_TOKEN_ENV, TELEGRAM_HINT)
}

/// Anthropic API key alone, for commands that never talk to Telegram.
pub fn anthropic_api_key(lookup: impl Fn(&str) -> Option<String>) -> Result<Secret<String>> {
    required(&lookup, ANTHROPIC_API_KEY_ENV, ANTHROPIC_HINT)
}

pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    hint: &'static str,
) -> Result<Secret<String>> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(Secret::new)
        .ok_or(Error::MissingEnv { name, hint })
}
