//! HTTP completion/generation client.
//!
//! Implements the core [`Generator`] trait against an OpenAI-compatible
//! `POST /chat/completions` endpoint, with an optional token-by-token
//! streaming mode that parses the service's SSE frames (`data:` lines
//! terminated by `[DONE]`) and hands each text delta to a caller-supplied
//! callback.
//!
//! As with every client in this crate, service errors are surfaced
//! unmodified and nothing is retried.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use rag_harness_core::llm::{GenerationRequest, Generator};

use crate::config::GenerationConfig;

/// Generation client for OpenAI-compatible chat completion services.
pub struct HttpGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpGenerator {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable named by
    /// `api_key_env` is not set.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "stream": stream,
        })
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Generation API error {}: {}", status, body_text);
        }
        Ok(response)
    }

    /// Generate with streaming, invoking `on_token` for every text delta
    /// as it arrives. Returns the accumulated completion.
    pub async fn generate_streaming(
        &self,
        request: &GenerationRequest,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let body = self.request_body(request, true);
        let mut response = self.send(&body).await?;

        let mut full = String::new();
        let mut buffer = String::new();
        while let Some(bytes) = response.chunk().await? {
            buffer.push_str(&String::from_utf8_lossy(&bytes));
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer.drain(..=pos);
                let Some(payload) = line.strip_prefix("data:") else {
                    continue;
                };
                let payload = payload.trim();
                if payload == "[DONE]" {
                    return Ok(full);
                }
                let json: serde_json::Value = serde_json::from_str(payload)?;
                if let Some(delta) = json
                    .get("choices")
                    .and_then(|c| c.get(0))
                    .and_then(|c| c.get("delta"))
                    .and_then(|d| d.get("content"))
                    .and_then(|t| t.as_str())
                {
                    full.push_str(delta);
                    on_token(delta);
                }
            }
        }
        Ok(full)
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = self.request_body(request, false);
        let response = self.send(&body).await?;
        let json: serde_json::Value = response.json().await?;
        parse_completion_response(&json)
    }
}

/// Extract `choices[0].message.content` from a completion response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_response() {
        let json = serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": "hello" } } ]
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "hello");
    }

    #[test]
    fn test_parse_completion_response_missing_content() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_completion_response(&json).is_err());
    }
}
