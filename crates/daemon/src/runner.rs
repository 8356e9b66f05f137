use std::{sync::Arc, time::Duration};

use {
    corphish_agents::Conversation,
    corphish_channels::{Channel, InboundUpdate},
    corphish_config::DaemonConfig,
    tokio::time::{Instant, Interval, MissedTickBehavior},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::Result,
    heartbeat::{HeartbeatOutcome, HeartbeatSettings, is_heartbeat_ok},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on a long-poll or sleeping after an empty one.
    Idle,
    /// Forwarding a batch to the model and relaying replies.
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSettings {
    pub poll_timeout: Duration,
    pub idle_sleep: Duration,
}

impl DaemonSettings {
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            poll_timeout: config.poll_timeout(),
            idle_sleep: config.idle_sleep(),
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self::from_config(&DaemonConfig::default())
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// State after the cycle.
    pub state: LoopState,
    /// Updates returned by the poll.
    pub polled: usize,
    /// Updates that reached the model and got a reply relayed.
    pub forwarded: usize,
    /// Offset for the next poll.
    pub offset: i64,
}

enum Event {
    Shutdown,
    Heartbeat,
    Updates(Vec<InboundUpdate>),
}

/// Relays messages from the bootstrapped chat to the conversation and back.
pub struct Daemon {
    channel: Arc<dyn Channel>,
    conversation: Arc<Conversation>,
    chat_id: String,
    settings: DaemonSettings,
    heartbeat: Option<HeartbeatSettings>,
    offset: i64,
    state: LoopState,
}

impl Daemon {
    pub fn new(
        channel: Arc<dyn Channel>,
        conversation: Arc<Conversation>,
        chat_id: i64,
        settings: DaemonSettings,
    ) -> Self {
        Self {
            channel,
            conversation,
            chat_id: chat_id.to_string(),
            settings,
            heartbeat: None,
            offset: 0,
            state: LoopState::Idle,
        }
    }

    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Option<HeartbeatSettings>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Poll until cancelled. Any poll, model or relay failure ends the loop
    /// with that error.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            chat_id = %self.chat_id,
            channel = self.channel.name(),
            poll_timeout_secs = self.settings.poll_timeout.as_secs(),
            heartbeat = self.heartbeat.is_some(),
            "daemon started"
        );
        let mut heartbeat = self.heartbeat.as_ref().map(|hb| {
            let mut interval = tokio::time::interval_at(Instant::now() + hb.interval, hb.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => Event::Shutdown,
                () = next_tick(&mut heartbeat) => Event::Heartbeat,
                polled = self.channel.poll(self.offset, self.settings.poll_timeout) => {
                    Event::Updates(polled?)
                },
            };

            match event {
                Event::Shutdown => break,
                Event::Heartbeat => {
                    self.heartbeat_tick().await;
                },
                Event::Updates(updates) if updates.is_empty() => {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.settings.idle_sleep) => {},
                    }
                },
                Event::Updates(updates) => {
                    self.process_batch(updates).await?;
                },
            }
        }

        info!(offset = self.offset, "daemon stopped");
        Ok(())
    }

    /// Exactly one poll followed by processing of whatever it returned.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        let updates = self
            .channel
            .poll(self.offset, self.settings.poll_timeout)
            .await?;
        self.process_batch(updates).await
    }

    /// Process a polled batch strictly in order and advance the offset past
    /// every update in it, forwarded or not.
    pub async fn process_batch(&mut self, updates: Vec<InboundUpdate>) -> Result<CycleReport> {
        let polled = updates.len();
        if polled == 0 {
            return Ok(self.report(0, 0));
        }
        debug!(count = polled, offset = self.offset, "processing update batch");

        self.state = LoopState::Processing;
        let mut forwarded = 0;
        let mut result = Ok(());
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            match self.handle_update(&update).await {
                Ok(true) => forwarded += 1,
                Ok(false) => {},
                Err(e) => {
                    result = Err(e);
                    break;
                },
            }
        }
        self.state = LoopState::Idle;
        result?;

        Ok(self.report(polled, forwarded))
    }

    async fn handle_update(&self, update: &InboundUpdate) -> Result<bool> {
        let Some(text) = update.message_text() else {
            debug!(update_id = update.update_id, "skipping update without text");
            return Ok(false);
        };
        let from = update
            .message
            .as_ref()
            .map(|m| m.chat_id.as_str())
            .unwrap_or_default();
        if from != self.chat_id {
            debug!(
                update_id = update.update_id,
                chat_id = from,
                "skipping message from foreign chat"
            );
            return Ok(false);
        }

        info!(update_id = update.update_id, "forwarding message to model");
        let reply = self.conversation.send(text).await?;
        self.channel.send(&self.chat_id, &reply).await?;
        debug!(update_id = update.update_id, "reply relayed");
        Ok(true)
    }

    /// Run one heartbeat. Failures are logged and never stop the loop.
    ///
    /// Inside [`Daemon::run`] a tick only fires between batches, so the busy
    /// gate matters only when the conversation is shared with another task.
    pub async fn heartbeat_tick(&self) -> HeartbeatOutcome {
        let Some(hb) = &self.heartbeat else {
            return HeartbeatOutcome::Disabled;
        };
        if hb.idle_only && self.conversation.busy() {
            debug!("conversation busy, skipping heartbeat");
            return HeartbeatOutcome::SkippedBusy;
        }

        let reply = match self.conversation.send(&hb.prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "heartbeat completion failed");
                return HeartbeatOutcome::Failed;
            },
        };
        if is_heartbeat_ok(&reply) {
            debug!("heartbeat acknowledged, nothing to relay");
            return HeartbeatOutcome::Acknowledged;
        }
        match self.channel.send(&self.chat_id, &reply).await {
            Ok(()) => {
                info!("heartbeat reply relayed");
                HeartbeatOutcome::Relayed
            },
            Err(e) => {
                warn!(error = %e, "failed to relay heartbeat reply");
                HeartbeatOutcome::Failed
            },
        }
    }

    fn report(&self, polled: usize, forwarded: usize) -> CycleReport {
        CycleReport {
            state: self.state,
            polled,
            forwarded,
            offset: self.offset,
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Error, heartbeat::HEARTBEAT_OK},
        async_trait::async_trait,
        corphish_agents::{Completion, LlmProvider, Turn, Usage},
        corphish_channels::InboundMessage,
        std::{collections::VecDeque, sync::Mutex},
    };

    /// Channel that replays scripted batches, then long-polls empty.
    #[derive(Default)]
    struct ScriptedChannel {
        batches: Mutex<VecDeque<corphish_channels::Result<Vec<InboundUpdate>>>>,
        polled_offsets: Mutex<Vec<i64>>,
        sent: Mutex<Vec<(String, String)>>,
        fail_send: bool,
    }

    impl ScriptedChannel {
        fn with_batches(batches: Vec<Vec<InboundUpdate>>) -> Self {
            Self {
                batches: Mutex::new(batches.into_iter().map(Ok).collect()),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn deliver(&self, endpoint: &str, text: &str) -> corphish_channels::Result<()> {
            if self.fail_send {
                return Err(corphish_channels::Error::external(
                    "scripted send",
                    std::io::Error::other("relay down"),
                ));
            }
            self.sent
                .lock()
                .unwrap()
                .push((endpoint.to_string(), text.to_string()));
            Ok(())
        }

        async fn poll(
            &self,
            offset: i64,
            timeout: Duration,
        ) -> corphish_channels::Result<Vec<InboundUpdate>> {
            self.polled_offsets.lock().unwrap().push(offset);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => {
                    tokio::time::sleep(timeout).await;
                    Ok(Vec::new())
                },
            }
        }
    }

    /// Provider that replies `re: <last user text>` unless told otherwise.
    #[derive(Default)]
    struct RecordingProvider {
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-1"
        }

        async fn complete(
            &self,
            _system: Option<&str>,
            turns: &[Turn],
        ) -> corphish_agents::Result<Completion> {
            let last = turns.last().map(|t| t.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(last.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Completion {
                text: self.reply.clone().unwrap_or_else(|| format!("re: {last}")),
                usage: Usage::default(),
            })
        }
    }

    fn daemon(
        channel: Arc<ScriptedChannel>,
        provider: Arc<RecordingProvider>,
    ) -> (Daemon, Arc<Conversation>) {
        let conversation = Arc::new(Conversation::new(provider));
        let settings = DaemonSettings {
            poll_timeout: Duration::from_millis(20),
            idle_sleep: Duration::from_millis(5),
        };
        let daemon = Daemon::new(channel, Arc::clone(&conversation), 42, settings);
        (daemon, conversation)
    }

    fn prompts(provider: &RecordingProvider) -> Vec<String> {
        provider.prompts.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn batch_is_forwarded_in_order_and_offset_advances() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![vec![
            InboundUpdate::text(1, "42", "first"),
            InboundUpdate::text(2, "42", "second"),
        ]]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, conversation) = daemon(channel.clone(), provider.clone());

        let report = daemon.run_once().await.unwrap();

        assert_eq!(report, CycleReport {
            state: LoopState::Idle,
            polled: 2,
            forwarded: 2,
            offset: 3,
        });
        assert_eq!(prompts(&provider), vec!["first", "second"]);
        assert_eq!(channel.sent(), vec![
            ("42".to_string(), "re: first".to_string()),
            ("42".to_string(), "re: second".to_string()),
        ]);
        assert_eq!(conversation.len().await, 4);
        assert_eq!(*channel.polled_offsets.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn foreign_chat_is_skipped_but_offset_advances() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![vec![
            InboundUpdate::text(7, "99", "intruder"),
        ]]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel.clone(), provider.clone());

        let report = daemon.run_once().await.unwrap();

        assert_eq!(report.forwarded, 0);
        assert_eq!(report.offset, 8);
        assert!(prompts(&provider).is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn updates_without_text_never_reach_the_model() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![vec![
            InboundUpdate {
                update_id: 10,
                message: None,
            },
            InboundUpdate {
                update_id: 11,
                message: Some(InboundMessage {
                    chat_id: "42".into(),
                    text: None,
                }),
            },
            InboundUpdate::text(12, "42", ""),
        ]]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel.clone(), provider.clone());

        let report = daemon.run_once().await.unwrap();

        assert_eq!(report.polled, 3);
        assert_eq!(report.forwarded, 0);
        assert_eq!(report.offset, 13);
        assert!(prompts(&provider).is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn blank_message_is_skipped_and_rest_of_batch_forwarded() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![vec![
            InboundUpdate::text(1, "42", "   "),
            InboundUpdate::text(2, "42", "real question"),
        ]]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, conversation) = daemon(channel.clone(), provider.clone());

        let report = daemon.run_once().await.unwrap();

        assert_eq!(report.polled, 2);
        assert_eq!(report.forwarded, 1);
        assert_eq!(report.offset, 3);
        assert_eq!(prompts(&provider), vec!["real question"]);
        assert_eq!(channel.sent(), vec![(
            "42".to_string(),
            "re: real question".to_string()
        )]);
        assert_eq!(conversation.len().await, 2);
    }

    #[tokio::test]
    async fn empty_batch_leaves_offset_unchanged() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![
            vec![InboundUpdate::text(4, "42", "hi")],
            vec![],
        ]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel.clone(), provider);

        assert_eq!(daemon.run_once().await.unwrap().offset, 5);
        let report = daemon.run_once().await.unwrap();
        assert_eq!(report.polled, 0);
        assert_eq!(report.offset, 5);
        assert_eq!(*channel.polled_offsets.lock().unwrap(), vec![0, 5]);
    }

    #[tokio::test]
    async fn mixed_batch_only_forwards_own_chat() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![vec![
            InboundUpdate::text(20, "42", "mine"),
            InboundUpdate::text(21, "13", "theirs"),
            InboundUpdate::text(22, "42", "mine again"),
        ]]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel.clone(), provider.clone());

        let report = daemon.run_once().await.unwrap();

        assert_eq!(report.forwarded, 2);
        assert_eq!(report.offset, 23);
        assert_eq!(prompts(&provider), vec!["mine", "mine again"]);
        assert!(channel.sent().iter().all(|(chat, _)| chat == "42"));
    }

    #[tokio::test]
    async fn offset_never_moves_backwards() {
        let channel = Arc::new(ScriptedChannel::default());
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel, provider);

        daemon
            .process_batch(vec![InboundUpdate::text(9, "42", "late")])
            .await
            .unwrap();
        let report = daemon
            .process_batch(vec![InboundUpdate::text(3, "42", "stale")])
            .await
            .unwrap();
        assert_eq!(report.offset, 10);
    }

    #[tokio::test]
    async fn relay_failure_propagates() {
        let channel = Arc::new(ScriptedChannel {
            fail_send: true,
            ..ScriptedChannel::with_batches(vec![vec![InboundUpdate::text(1, "42", "hi")]])
        });
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel, provider);

        let err = daemon.run_once().await.unwrap_err();
        assert!(matches!(err, Error::Channel(_)));
        assert_eq!(daemon.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn poll_failure_ends_run() {
        let channel = Arc::new(ScriptedChannel::default());
        channel
            .batches
            .lock()
            .unwrap()
            .push_back(Err(corphish_channels::Error::external(
                "scripted poll",
                std::io::Error::other("network down"),
            )));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel, provider);

        let err = daemon.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Channel(_)));
    }

    #[tokio::test]
    async fn run_forwards_until_cancelled() {
        let channel = Arc::new(ScriptedChannel::with_batches(vec![
            vec![InboundUpdate::text(1, "42", "one")],
            vec![],
            vec![InboundUpdate::text(2, "42", "two")],
        ]));
        let provider = Arc::new(RecordingProvider::default());
        let (mut daemon, _) = daemon(channel.clone(), provider.clone());

        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                daemon.run(cancel).await.unwrap();
                daemon
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        let daemon = task.await.unwrap();

        assert_eq!(prompts(&provider), vec!["one", "two"]);
        assert_eq!(channel.sent().len(), 2);
        assert_eq!(daemon.offset(), 3);
    }

    #[tokio::test]
    async fn heartbeat_ok_is_not_relayed() {
        let channel = Arc::new(ScriptedChannel::default());
        let provider = Arc::new(RecordingProvider {
            reply: Some(format!("**{HEARTBEAT_OK}**")),
            ..Default::default()
        });
        let (daemon, _) = daemon(channel.clone(), provider.clone());
        let daemon = daemon.with_heartbeat(Some(HeartbeatSettings {
            interval: Duration::from_secs(60),
            idle_only: true,
            prompt: "check in".into(),
        }));

        assert_eq!(daemon.heartbeat_tick().await, HeartbeatOutcome::Acknowledged);
        assert_eq!(prompts(&provider), vec!["check in"]);
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn heartbeat_with_news_is_relayed() {
        let channel = Arc::new(ScriptedChannel::default());
        let provider = Arc::new(RecordingProvider {
            reply: Some("Your meeting starts in 5 minutes.".into()),
            ..Default::default()
        });
        let (daemon, _) = daemon(channel.clone(), provider);
        let daemon = daemon.with_heartbeat(Some(HeartbeatSettings {
            interval: Duration::from_secs(60),
            idle_only: true,
            prompt: "check in".into(),
        }));

        assert_eq!(daemon.heartbeat_tick().await, HeartbeatOutcome::Relayed);
        assert_eq!(channel.sent(), vec![(
            "42".to_string(),
            "Your meeting starts in 5 minutes.".to_string()
        )]);
    }

    #[tokio::test]
    async fn heartbeat_skipped_while_conversation_busy() {
        let channel = Arc::new(ScriptedChannel::default());
        let provider = Arc::new(RecordingProvider {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let (daemon, conversation) = daemon(channel, provider.clone());
        let daemon = daemon.with_heartbeat(Some(HeartbeatSettings {
            interval: Duration::from_secs(60),
            idle_only: true,
            prompt: "check in".into(),
        }));

        let busy = tokio::spawn(async move { conversation.send("slow question").await });
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(daemon.heartbeat_tick().await, HeartbeatOutcome::SkippedBusy);
        busy.await.unwrap().unwrap();
        assert_eq!(prompts(&provider), vec!["slow question"]);
    }

    #[tokio::test]
    async fn disabled_heartbeat_does_nothing() {
        let provider = Arc::new(RecordingProvider::default());
        let (daemon, _) = daemon(Arc::new(ScriptedChannel::default()), provider.clone());
        assert_eq!(daemon.heartbeat_tick().await, HeartbeatOutcome::Disabled);
        assert!(prompts(&provider).is_empty());
    }

    #[tokio::test]
    async fn run_fires_heartbeat_between_polls() {
        let channel = Arc::new(ScriptedChannel::default());
        let provider = Arc::new(RecordingProvider {
            reply: Some(HEARTBEAT_OK.into()),
            ..Default::default()
        });
        let (daemon, _) = daemon(channel.clone(), provider.clone());
        let mut daemon = daemon.with_heartbeat(Some(HeartbeatSettings {
            interval: Duration::from_millis(10),
            idle_only: true,
            prompt: "check in".into(),
        }));

        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { daemon.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(80)).await;
        cancel.cancel();
        task.await.unwrap().unwrap();

        let prompts = prompts(&provider);
        assert!(!prompts.is_empty());
        assert!(prompts.iter().all(|p| p == "check in"));
        assert!(channel.sent().is_empty());
    }
}
