//! HTTP contextual-compression client.
//!
//! Implements the core [`Compressor`] trait against a compression
//! service's `POST /compress` endpoint. The service receives the query,
//! the candidate texts, and a token budget, and answers with the indices
//! of the candidates worth keeping; the client returns them in their
//! original order so downstream stages preserve retrieval ordering.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use rag_harness_core::llm::Compressor;

use crate::config::CompressionConfig;

#[derive(Debug, Deserialize)]
struct CompressResponse {
    results: Vec<CompressEntry>,
}

#[derive(Debug, Deserialize)]
struct CompressEntry {
    index: usize,
}

/// Compression client.
pub struct HttpCompressor {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpCompressor {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_key_env` names an environment variable
    /// that is not set.
    pub fn new(config: &CompressionConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(
                std::env::var(var)
                    .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?,
            ),
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Compressor for HttpCompressor {
    async fn compress(
        &self,
        query: &str,
        candidates: &[String],
        max_tokens: usize,
    ) -> Result<Vec<usize>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": candidates,
            "token_budget": max_tokens,
        });

        let mut request = self
            .client
            .post(format!("{}/compress", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Compression API error {}: {}", status, body_text);
        }

        let parsed: CompressResponse = response.json().await?;
        let mut indices: Vec<usize> = Vec::with_capacity(parsed.results.len());
        for entry in parsed.results {
            if entry.index >= candidates.len() {
                bail!(
                    "Invalid compression response: index {} out of range",
                    entry.index
                );
            }
            indices.push(entry.index);
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }
}
