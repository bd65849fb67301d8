//! HTTP vector store client.
//!
//! Implements the core [`VectorStore`] trait against a Qdrant-style REST
//! API: collection creation, point upsert, and nearest-neighbor search.
//! The store owns the similarity index; this client only moves records
//! and results over the wire.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use rag_harness_core::embedding::DistanceMetric;
use rag_harness_core::store::{SearchHit, VectorRecord, VectorStore};

use crate::config::StoreConfig;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchPoint>,
}

#[derive(Debug, Deserialize)]
struct SearchPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: BTreeMap<String, serde_json::Value>,
}

/// Vector store client for Qdrant-compatible services.
pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    metric: DistanceMetric,
}

impl HttpVectorStore {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_key_env` names an environment variable
    /// that is not set.
    pub fn new(config: &StoreConfig) -> Result<Self> {
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
            collection: config.collection.clone(),
            metric: config.metric,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Vector store {} error {}: {}", what, status, body_text);
        }
        Ok(response)
    }

    /// Create the collection if it does not exist.
    ///
    /// Idempotent: an existing collection with the same parameters is
    /// left untouched (HTTP 409 is treated as success).
    pub async fn ensure_collection(&self, dims: usize) -> Result<()> {
        let body = serde_json::json!({
            "vectors": {
                "size": dims,
                "distance": distance_name(self.metric),
            }
        });
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{}", self.collection),
            )
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        Self::check(response, "collection create").await?;
        Ok(())
    }
}

/// The store's wire name for each metric.
fn distance_name(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "Cosine",
        DistanceMetric::L2 => "Euclid",
        DistanceMetric::InnerProduct => "Dot",
    }
}

/// Pull the chunk text back out of a point payload.
fn payload_text(payload: &BTreeMap<String, serde_json::Value>) -> String {
    payload
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Everything in the payload except `text` becomes string metadata.
fn payload_metadata(payload: &BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    payload
        .iter()
        .filter(|(k, _)| k.as_str() != "text")
        .map(|(k, v)| {
            let value = match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                let mut payload = serde_json::Map::new();
                payload.insert("text".to_string(), serde_json::json!(r.text));
                for (k, v) in &r.metadata {
                    payload.insert(k.clone(), serde_json::json!(v));
                }
                serde_json::json!({
                    "id": r.id,
                    "vector": r.vector,
                    "payload": payload,
                })
            })
            .collect();

        let body = serde_json::json!({ "points": points });
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{}/points", self.collection),
            )
            .query(&[("wait", "true")])
            .json(&body)
            .send()
            .await?;
        Self::check(response, "upsert").await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let body = serde_json::json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/points/search", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "search").await?;

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .result
            .into_iter()
            .map(|p| SearchHit {
                id: match p.id.as_str() {
                    Some(s) => s.to_string(),
                    None => p.id.to_string(),
                },
                score: p.score,
                text: payload_text(&p.payload),
                metadata: payload_metadata(&p.payload),
            })
            .collect())
    }
}
