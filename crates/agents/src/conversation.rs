use std::sync::Arc;

use {
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    model::{LlmProvider, Turn},
    policy::{HistoryPolicy, Unbounded},
};

/// The single running conversation with the model.
///
/// `send` holds the history lock for the whole round trip, so at most one
/// completion is outstanding and turns never interleave.
pub struct Conversation {
    provider: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
    policy: Box<dyn HistoryPolicy>,
    history: Mutex<Vec<Turn>>,
}

impl Conversation {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            system_prompt: None,
            policy: Box::new(Unbounded),
            history: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn HistoryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Send one user message and return the model's reply.
    ///
    /// On success history grows by exactly one user turn and one assistant
    /// turn. On failure history is left as it was.
    pub async fn send(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }

        let mut history = self.history.lock().await;
        history.push(Turn::user(text));

        let window = self.policy.window(&history);
        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            history_len = history.len(),
            window_len = window.len(),
            "sending conversation turn"
        );
        let result = self
            .provider
            .complete(self.system_prompt.as_deref(), window)
            .await;

        match result {
            Ok(completion) if !completion.text.trim().is_empty() => {
                history.push(Turn::assistant(completion.text.clone()));
                info!(
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    history_len = history.len(),
                    "conversation turn complete"
                );
                Ok(completion.text)
            },
            Ok(_) => {
                history.pop();
                warn!("model returned an empty reply");
                Err(Error::EmptyReply)
            },
            Err(e) => {
                history.pop();
                Err(e)
            },
        }
    }

    /// True while a `send` is in flight.
    pub fn busy(&self) -> bool {
        self.history.try_lock().is_err()
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.history.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.history.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.history.lock().await.clear();
    }
}
