use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    teloxide::{
        prelude::*,
        types::{AllowedUpdate, ChatId, Update, UpdateKind},
    },
    tracing::{debug, info},
};

use corphish_channels::{Channel, Error, InboundMessage, InboundUpdate, Result};

use crate::{
    config::TelegramConfig,
    markdown::{TELEGRAM_MAX_MESSAGE_LEN, chunk_message},
};

const CHANNEL: &str = "telegram";

/// Telegram Bot API transport.
///
/// Endpoints are decimal chat ids (`"42"`, `"-1001234"`).
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    /// Build a bot client whose HTTP timeout outlasts the long-poll window.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::external("build telegram http client", e))?;
        let mut bot = Bot::with_client(config.token.expose_secret(), client);
        if let Some(api_url) = &config.api_url {
            let url = reqwest::Url::parse(api_url)
                .map_err(|e| Error::external(format!("parse telegram api url {api_url}"), e))?;
            bot = bot.set_api_url(url);
        }
        Ok(Self { bot })
    }

    pub fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }

    /// Verify the token and clear any webhook so `getUpdates` works.
    ///
    /// Returns the bot's username.
    pub async fn connect(&self) -> Result<Option<String>> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| Error::external("telegram getMe", e))?;
        self.bot
            .delete_webhook()
            .send()
            .await
            .map_err(|e| Error::external("telegram deleteWebhook", e))?;
        let username = me.username.clone();
        info!(username = ?username, "telegram bot connected (webhook cleared)");
        Ok(username)
    }

    fn parse_chat_id(endpoint: &str) -> Result<ChatId> {
        endpoint
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| Error::InvalidEndpoint {
                channel: CHANNEL,
                endpoint: endpoint.to_string(),
            })
    }
}

fn to_inbound(update: Update) -> InboundUpdate {
    let update_id = i64::from(update.id.0);
    let message = match update.kind {
        UpdateKind::Message(msg) => Some(InboundMessage {
            chat_id: msg.chat.id.0.to_string(),
            text: msg.text().map(str::to_string),
        }),
        other => {
            debug!(update_id, "ignoring non-message update: {other:?}");
            None
        },
    };
    InboundUpdate { update_id, message }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn deliver(&self, endpoint: &str, text: &str) -> Result<()> {
        let chat_id = Self::parse_chat_id(endpoint)?;
        let chunks = chunk_message(text, TELEGRAM_MAX_MESSAGE_LEN);
        let count = chunks.len();
        for chunk in chunks {
            self.bot
                .send_message(chat_id, chunk)
                .await
                .map_err(|e| Error::external("telegram sendMessage", e))?;
        }
        debug!(chat_id = chat_id.0, chunks = count, "sent telegram message");
        Ok(())
    }

    async fn poll(&self, offset: i64, timeout: Duration) -> Result<Vec<InboundUpdate>> {
        let offset =
            i32::try_from(offset).map_err(|e| Error::external("telegram update offset", e))?;
        let timeout = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(timeout)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await
            .map_err(|e| Error::external("telegram getUpdates", e))?;
        debug!(count = updates.len(), offset, "got telegram updates");
        Ok(updates.into_iter().map(to_inbound).collect())
    }
}
