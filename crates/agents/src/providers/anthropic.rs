use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, trace, warn},
};

use crate::{
    error::{Error, Result},
    model::{Completion, LlmProvider, Turn, Usage},
};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: Secret<String>, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Base URL precedence: explicit config, then `ANTHROPIC_BASE_URL`, then the
/// public API.
pub fn resolve_base_url(
    configured: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    configured
        .map(str::to_string)
        .or_else(|| lookup("ANTHROPIC_BASE_URL"))
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string())
}

fn to_u32(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: Option<&str>, turns: &[Turn]) -> Result<Completion> {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": turns,
        });
        if let Some(sys) = system {
            body["system"] = serde_json::Value::String(sys.to_string());
        }

        debug!(
            model = %self.model,
            messages_count = turns.len(),
            has_system = system.is_some(),
            "anthropic complete request"
        );

        let http_resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "anthropic API error");
            return Err(Error::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "anthropic raw response");

        let text = resp["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"].as_str() == Some("text"))
                    .filter_map(|b| b["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = Usage {
            input_tokens: to_u32(&resp["usage"]["input_tokens"]),
            output_tokens: to_u32(&resp["usage"]["output_tokens"]),
        };
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "anthropic complete response"
        );

        Ok(Completion { text, usage })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn provider(server: &mockito::Server) -> AnthropicProvider {
        AnthropicProvider::new(
            Secret::new("sk-test".into()),
            "test-model".into(),
            server.url(),
        )
    }

    #[tokio::test]
    async fn complete_posts_messages_and_concatenates_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::Json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 4096,
                "system": "sys",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "again"},
                ],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"content":[
                    {"type":"text","text":"Hello "},
                    {"type":"tool_use","id":"x","name":"y","input":{}},
                    {"type":"text","text":"there"}
                ],"usage":{"input_tokens":12,"output_tokens":3}}"#,
            )
            .create_async()
            .await;

        let turns = [Turn::user("hi"), Turn::assistant("hello"), Turn::user("again")];
        let completion = provider(&server)
            .complete(Some("sys"), &turns)
            .await
            .unwrap();

        assert_eq!(completion.text, "Hello there");
        assert_eq!(completion.usage, Usage {
            input_tokens: 12,
            output_tokens: 3
        });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn system_is_omitted_when_absent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_body(Matcher::Json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 128,
                "messages": [{"role": "user", "content": "hi"}],
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"ok"}]}"#)
            .create_async()
            .await;

        let completion = provider(&server)
            .with_max_tokens(128)
            .complete(None, &[Turn::user("hi")])
            .await
            .unwrap();
        assert_eq!(completion.text, "ok");
        assert_eq!(completion.usage, Usage::default());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#)
            .create_async()
            .await;

        let err = provider(&server)
            .complete(None, &[Turn::user("hi")])
            .await
            .unwrap_err();
        match err {
            Error::Api { status, body } => {
                assert_eq!(status, 529);
                assert!(body.contains("overloaded_error"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn base_url_precedence() {
        let env = |_: &str| Some("http://proxy.local".to_string());
        let none = |_: &str| None;
        assert_eq!(
            resolve_base_url(Some("http://cfg.local"), env),
            "http://cfg.local"
        );
        assert_eq!(resolve_base_url(None, env), "http://proxy.local");
        assert_eq!(resolve_base_url(None, none), ANTHROPIC_BASE_URL);
    }
}
