use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    corphish_channels::{Channel, Error as ChannelError},
    corphish_config::{ConfigStore, DaemonConfig, Secrets},
    tracing::{debug, info},
};

use crate::{
    error::Result,
    service::{ServiceInstaller, ServiceSpec},
};

pub const GREETING: &str = "Hello! I'm Corphish, your personal AI assistant. \
                            I'm set up and running. Send me a message to get started.";

/// Where the bootstrapped chat id is persisted.
pub trait ChatIdStore: Send + Sync {
    fn save_chat_id(&self, chat_id: i64) -> Result<()>;
}

impl ChatIdStore for ConfigStore {
    fn save_chat_id(&self, chat_id: i64) -> Result<()> {
        ConfigStore::save_chat_id(self, chat_id)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSettings {
    pub poll_timeout: Duration,
    pub idle_sleep: Duration,
}

impl BootstrapSettings {
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            poll_timeout: config.poll_timeout(),
            idle_sleep: config.idle_sleep(),
        }
    }
}

/// Long-poll until any update carrying a message arrives and return its chat.
pub async fn wait_for_first_message(
    channel: &dyn Channel,
    settings: &BootstrapSettings,
) -> Result<i64> {
    let mut offset = 0;
    loop {
        let updates = channel.poll(offset, settings.poll_timeout).await?;
        let empty = updates.is_empty();
        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                debug!(update_id = update.update_id, "update without message, waiting");
                continue;
            };
            let chat_id = message.chat_id.trim().parse::<i64>().map_err(|_| {
                ChannelError::InvalidEndpoint {
                    channel: channel.name(),
                    endpoint: message.chat_id.clone(),
                }
            })?;
            return Ok(chat_id);
        }
        if empty {
            tokio::time::sleep(settings.idle_sleep).await;
        }
    }
}

/// First-run flow. Every side effect goes through an injected collaborator.
pub struct Bootstrap<'a> {
    pub store: &'a dyn ChatIdStore,
    pub installer: &'a dyn ServiceInstaller,
    pub settings: BootstrapSettings,
    /// Binary the service manager should launch.
    pub program: PathBuf,
    pub log_dir: PathBuf,
}

impl Bootstrap<'_> {
    /// Run all phases in order and return the bootstrapped chat id.
    ///
    /// `resolve_secrets` runs first so a missing secret aborts before any
    /// network call; `connect` builds the channel from the verified secrets.
    pub async fn run<R, C>(&self, resolve_secrets: R, connect: C) -> Result<i64>
    where
        R: FnOnce() -> corphish_config::Result<Secrets>,
        C: FnOnce(&Secrets) -> Result<Arc<dyn Channel>>,
    {
        info!("starting corphish first-run setup");
        let secrets = resolve_secrets()?;
        let channel = connect(&secrets)?;

        println!("Send any message to your bot in Telegram to continue setup...");
        let chat_id = wait_for_first_message(channel.as_ref(), &self.settings).await?;

        self.store.save_chat_id(chat_id)?;
        info!(chat_id, "chat id saved");
        println!("✓ Chat ID saved: {chat_id}");

        channel.send(&chat_id.to_string(), GREETING).await?;
        println!("✓ Greeting sent");

        let spec = ServiceSpec::for_daemon(self.program.clone(), self.log_dir.clone(), &secrets);
        let path = self.installer.install(&spec)?;
        println!("✓ Service installed at {}", path.display());

        info!(chat_id, "bootstrap complete");
        Ok(chat_id)
    }
}
