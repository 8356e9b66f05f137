use {
    anyhow::{Result, bail},
    corphish_channels::Channel,
    corphish_config::{ConfigStore, CorphishConfig, secrets::env_lookup},
    tracing::info,
};

use crate::run_commands::telegram_channel;

/// Configured chat id, or the remediation message when bootstrap never ran.
pub(crate) fn require_chat_id(config: &CorphishConfig) -> Result<i64> {
    match config.chat_id {
        Some(chat_id) => Ok(chat_id),
        None => bail!("chat_id is not configured. Run `corphish bootstrap` first."),
    }
}

/// Send `text` to the bootstrapped Telegram chat.
pub async fn send(text: &str) -> Result<()> {
    let config = ConfigStore::new()?.load_typed()?;
    let chat_id = require_chat_id(&config)?;
    let token = corphish_config::secrets::telegram_bot_token(env_lookup)?;

    let channel = telegram_channel(token, &config.daemon)?;
    channel.send(&chat_id.to_string(), text).await?;
    info!(chat_id, "message sent");
    Ok(())
}
