//! HTTP reranking client.
//!
//! Implements the core [`Reranker`] trait against a Cohere-style
//! `POST /rerank` endpoint: the service judges each candidate against
//! the query and returns a reordered, truncated subset with relevance
//! scores and original indices.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use rag_harness_core::llm::{RerankResult, Reranker};

use crate::config::RerankConfig;

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    relevance_score: f32,
}

/// Reranking client for Cohere-compatible services.
pub struct HttpReranker {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpReranker {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable named by
    /// `api_key_env` is not set.
    pub fn new(config: &RerankConfig) -> Result<Self> {
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
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": candidates,
            "top_n": top_n,
        });

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Rerank API error {}: {}", status, body_text);
        }

        let parsed: RerankResponse = response.json().await?;
        let mut results = Vec::with_capacity(parsed.results.len());
        for entry in parsed.results {
            if entry.index >= candidates.len() {
                bail!("Invalid rerank response: index {} out of range", entry.index);
            }
            results.push(RerankResult {
                index: entry.index,
                score: entry.relevance_score,
            });
        }
        Ok(results)
    }
}
