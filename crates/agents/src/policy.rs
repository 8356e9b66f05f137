use crate::model::{Role, Turn};

/// Decides which part of the stored history is submitted to the model.
///
/// Stored history is never truncated; only the returned window is sent.
pub trait HistoryPolicy: Send + Sync {
    fn window<'a>(&self, history: &'a [Turn]) -> &'a [Turn];
}

/// Submit the full history.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl HistoryPolicy for Unbounded {
    fn window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        history
    }
}

/// Submit at most the last `n` turns, starting at a user turn.
#[derive(Debug, Clone, Copy)]
pub struct LastTurns(pub usize);

impl HistoryPolicy for LastTurns {
    fn window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        let n = self.0.max(1);
        let mut start = history.len().saturating_sub(n);
        while start < history.len() && history[start].role != Role::User {
            start += 1;
        }
        &history[start..]
    }
}

/// Policy for the `daemon.history_turns` setting.
pub fn policy_for(history_turns: Option<usize>) -> Box<dyn HistoryPolicy> {
    match history_turns {
        Some(n) => Box::new(LastTurns(n)),
        None => Box::new(Unbounded),
    }
}
