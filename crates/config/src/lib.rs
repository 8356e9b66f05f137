//! Configuration paths, the `config.toml` store, and required environment secrets.
//!
//! Config file: `config.toml` under the config directory
//! (`$XDG_CONFIG_HOME/corphish/` or `~/.config/corphish/`).
//!
//! Saving is read → deep merge → write temp → atomic rename.

pub mod error;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod secrets;

pub use {
    error::{Error, Result},
    loader::{
        CONFIG_FILENAME, ConfigStore, clear_config_dir, config_dir, ensure_config_dir,
        set_config_dir,
    },
    merge::deep_merge,
    schema::{
        CorphishConfig, DaemonConfig, DEFAULT_MODEL, GoogleChatConfig, HeartbeatConfig,
        ModelConfig,
    },
    secrets::{ANTHROPIC_API_KEY_ENV, Secrets, TELEGRAM_BOT_TOKEN_ENV},
};
