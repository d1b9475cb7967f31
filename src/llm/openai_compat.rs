//! OpenAI-compatible chat-completion adapter
//!
//! Adapts a (model id, history window, options) triple into a single
//! request against an OpenAI-style `/chat/completions` endpoint and maps
//! failures into the `DispatchError` taxonomy. No retries here; a failed
//! dispatch surfaces immediately to the calling engine.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatTurn, DispatchError, DispatchOptions, ModelDispatcher};
use crate::config::Config;

/// Dispatcher against an OpenAI-compatible HTTP endpoint
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDispatcher {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build a dispatcher from configuration, resolving the API key from
    /// the configured environment variable.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .dispatch
            .api_key()
            .context("No API key configured; set the key in Settings")?;
        Self::new(
            &config.dispatch.base_url,
            &api_key,
            Duration::from_secs(config.dispatch.timeout_secs),
        )
    }

    fn completions_url(&self) -> String {
        // Some deployments configure the full path already.
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

#[async_trait]
impl ModelDispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        model_id: &str,
        turns: &[ChatTurn],
        options: &DispatchOptions,
    ) -> Result<String, DispatchError> {
        let request = ChatCompletionRequest {
            model: model_id,
            messages: turns,
            max_tokens: Some(options.max_tokens),
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(DispatchError::from_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DispatchError::from_http_status(status, error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Unclassified(format!("failed to parse response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DispatchError::Unclassified("response contained no choices".to_string()))
    }
}

// OpenAI-compatible request/response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}
