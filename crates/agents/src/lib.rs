//! Model side of corphish: the LLM provider seam, the Anthropic client, and
//! the single locked conversation that every inbound message goes through.

pub mod conversation;
pub mod error;
pub mod model;
pub mod policy;
pub mod prompt;
pub mod providers;

pub use {
    conversation::Conversation,
    error::{Error, Result},
    model::{Completion, LlmProvider, Role, Turn, Usage},
    policy::{HistoryPolicy, LastTurns, Unbounded, policy_for},
    prompt::{DEFAULT_SYSTEM_PROMPT, IDENTITY_FILE, load_system_prompt},
    providers::anthropic::{ANTHROPIC_BASE_URL, AnthropicProvider},
};
