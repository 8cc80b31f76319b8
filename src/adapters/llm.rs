//! HTTP language model adapter.
//!
//! Speaks the OpenAI-compatible chat completions protocol, which most hosted
//! and self-hosted model gateways accept.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{CompletionRequest, LanguageModel};

/// Chat-completions client
pub struct HttpLanguageModel {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl HttpLanguageModel {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Apply a transport-level timeout on top of the caller's timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    fn body(&self, request: &CompletionRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    fn name(&self) -> &str {
        "http-llm"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut builder = self.client.post(&self.endpoint).json(&self.body(request));
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to reach language model")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Language model returned {}: {}", status, text.trim());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse language model response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("Language model response had no content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let model = HttpLanguageModel::new("http://localhost/v1/chat/completions", "small", None);
        let body = model.body(&CompletionRequest::new("sys", "user"));

        assert_eq!(body["model"], "small");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let model = HttpLanguageModel::new("http://127.0.0.1:9/v1/chat/completions", "small", None)
            .with_request_timeout(Duration::from_millis(200))
            .unwrap();
        let result = model.complete(&CompletionRequest::new("sys", "user")).await;
        assert!(result.is_err());
    }
}
