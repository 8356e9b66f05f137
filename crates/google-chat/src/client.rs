use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    corphish_channels::{Channel, InboundUpdate, validate_outbound},
    corphish_oauth::{CredentialStore, GOOGLE_CHAT_SCOPES, OAuthTokens},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://chat.googleapis.com";

const CHANNEL: &str = "google_chat";

/// Google Chat REST client authenticated with a user OAuth token.
///
/// Endpoints are space resource names (`spaces/AAAA...`).
pub struct GoogleChatChannel {
    access_token: Secret<String>,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SpaceResponse {
    name: Option<String>,
}

impl GoogleChatChannel {
    pub fn new(access_token: Secret<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(access_token: Secret<String>, base_url: impl Into<String>) -> Self {
        Self {
            access_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_tokens(tokens: &OAuthTokens) -> Self {
        Self::new(tokens.access_token.clone())
    }

    /// Obtain credentials (cached, refreshed or browser-authorized) and
    /// build a client from them.
    pub async fn authorize(client_secret_path: &Path, token_path: &Path) -> Result<Self> {
        let tokens = CredentialStore::new(GOOGLE_CHAT_SCOPES)
            .get(client_secret_path, token_path)
            .await?;
        Ok(Self::from_tokens(&tokens))
    }

    /// Create a named space and return its resource name.
    pub async fn create_space(&self, display_name: &str) -> Result<String> {
        let body = serde_json::json!({
            "displayName": display_name,
            "spaceType": "SPACE",
        });
        let resp = self
            .client
            .post(format!("{}/v1/spaces", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp, "create space").await?;
        let space: SpaceResponse = resp.json().await?;
        let name = space
            .name
            .filter(|n| !n.is_empty())
            .ok_or(Error::MissingField { field: "name" })?;
        info!(space = %name, display_name, "created google chat space");
        Ok(name)
    }

    /// Post `text` into `space_name`.
    pub async fn send_message(&self, space_name: &str, text: &str) -> Result<()> {
        validate_outbound(space_name, text)?;
        let resp = self
            .client
            .post(format!("{}/v1/{}/messages", self.base_url, space_name.trim()))
            .bearer_auth(self.access_token.expose_secret())
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        check_status(resp, "create message").await?;
        debug!(space = space_name, "sent google chat message");
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, operation, "google chat API error");
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Channel for GoogleChatChannel {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn deliver(&self, endpoint: &str, text: &str) -> corphish_channels::Result<()> {
        self.send_message(endpoint, text).await.map_err(|e| match e {
            Error::Channel(inner) => inner,
            other => corphish_channels::Error::external("google chat send", other),
        })
    }

    async fn poll(
        &self,
        _offset: i64,
        _timeout: Duration,
    ) -> corphish_channels::Result<Vec<InboundUpdate>> {
        Err(corphish_channels::Error::Unsupported {
            channel: CHANNEL,
            operation: "poll",
        })
    }
}
