//! HTTP embedding client.
//!
//! Implements the core [`Embedder`] trait against an OpenAI-compatible
//! `POST /embeddings` endpoint. Requests are batched according to the
//! configured batch size; vectors come back in input order.
//!
//! Service errors (network failure, authentication failure, quota
//! exhaustion) are surfaced to the caller unmodified — the client owns
//! no retry policy.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use rag_harness_core::embedding::Embedder;

use crate::config::EmbeddingConfig;

/// Embedding client for OpenAI-compatible services.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
}

impl HttpEmbedder {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable named by
    /// `api_key_env` is not set.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
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
            dims: config.dims,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Embedding API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_embeddings_response(&json, texts.len())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_one_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Parse the `data[].embedding` arrays out of an embeddings response,
/// reordering by each entry's `index` so output matches input order.
fn parse_embeddings_response(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: missing data array"))?;

    if data.len() != expected {
        bail!(
            "Invalid embedding response: expected {} vectors, got {}",
            expected,
            data.len()
        );
    }

    let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); data.len()];
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: missing embedding"))?;
        if index >= vectors.len() {
            bail!("Invalid embedding response: index {} out of range", index);
        }
        vectors[index] = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_in_order() {
        let json = serde_json::json!({
            "data": [
                { "index": 0, "embedding": [1.0, 2.0] },
                { "index": 1, "embedding": [3.0, 4.0] },
            ]
        });
        let vectors = parse_embeddings_response(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_parse_response_reorders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [3.0] },
                { "index": 0, "embedding": [1.0] },
            ]
        });
        let vectors = parse_embeddings_response(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![3.0]]);
    }

    #[test]
    fn test_parse_response_rejects_count_mismatch() {
        let json = serde_json::json!({
            "data": [ { "index": 0, "embedding": [1.0] } ]
        });
        assert!(parse_embeddings_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_response_rejects_missing_data() {
        let json = serde_json::json!({ "error": "nope" });
        assert!(parse_embeddings_response(&json, 1).is_err());
    }
}
