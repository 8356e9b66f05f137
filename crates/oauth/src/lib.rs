//! OAuth 2.0 credential lifecycle for the Google Chat transport.
//!
//! [`CredentialStore::get`] returns a usable token: cached if still valid,
//! refreshed if expired, or freshly authorized through the browser.

pub mod callback_server;
mod config_dir;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod storage;
pub mod types;

pub use {
    callback_server::CallbackServer,
    config_dir::{default_client_secret_path, default_token_path},
    credentials::{Authorizer, BrowserAuthorizer, CredentialStore, HttpRefresher, TokenRefresher},
    flow::{AuthorizationRequest, OAuthFlow},
    storage::TokenStore,
    types::{ClientSecret, OAuthTokens, PkceChallenge, serialize_option_secret, serialize_secret},
};

pub use error::{Error, Result};

/// Scopes needed to create a space and post into it.
pub const GOOGLE_CHAT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/chat.spaces.create",
    "https://www.googleapis.com/auth/chat.messages.create",
    "https://www.googleapis.com/auth/chat.spaces.readonly",
];
