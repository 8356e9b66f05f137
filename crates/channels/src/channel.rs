use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// One update observed on an inbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    /// Monotonic per-bot identifier; the next poll offset is `update_id + 1`.
    pub update_id: i64,
    /// `None` for updates that carry no message (edits, callbacks, joins, ...).
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Conversation the message was posted in, in the transport's own format.
    pub chat_id: String,
    /// `None` for non-text messages (photos, stickers, ...).
    pub text: Option<String>,
}

impl InboundUpdate {
    /// Convenience constructor for a text message update.
    pub fn text(update_id: i64, chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            update_id,
            message: Some(InboundMessage {
                chat_id: chat_id.into(),
                text: Some(text.into()),
            }),
        }
    }

    /// Message text, if any, with whitespace-only text treated as absent.
    #[must_use]
    pub fn message_text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Reject an outbound call before any side effect happens.
pub fn validate_outbound(endpoint: &str, text: &str) -> Result<()> {
    if endpoint.trim().is_empty() {
        return Err(Error::EmptyEndpoint);
    }
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    Ok(())
}

/// A request/response messaging transport. No retry or batching of its own.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short transport name for logs (`"telegram"`, `"google_chat"`).
    fn name(&self) -> &'static str;

    /// Send `text` to `endpoint`.
    ///
    /// Validation runs first, so an empty text or endpoint never reaches
    /// [`Channel::deliver`].
    async fn send(&self, endpoint: &str, text: &str) -> Result<()> {
        validate_outbound(endpoint, text)?;
        self.deliver(endpoint, text).await
    }

    /// Transport-specific delivery of already validated input.
    async fn deliver(&self, endpoint: &str, text: &str) -> Result<()>;

    /// Long-poll for updates with id `>= offset`, waiting at most `timeout`.
    async fn poll(&self, offset: i64, timeout: Duration) -> Result<Vec<InboundUpdate>>;
}
