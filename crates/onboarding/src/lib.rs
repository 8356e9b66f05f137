//! First-run bootstrap.
//!
//! Flow: verify secrets → wait for the first Telegram message → save
//! `chat_id` → send greeting → register with the OS service manager.

pub mod bootstrap;
pub mod error;
pub mod service;

pub use {
    bootstrap::{Bootstrap, BootstrapSettings, ChatIdStore, GREETING, wait_for_first_message},
    error::{Context, Error, Result},
    service::{
        LaunchdInstaller, SERVICE_LABEL, ServiceInstaller, ServiceSpec, SystemdInstaller,
        platform_installer,
    },
};
