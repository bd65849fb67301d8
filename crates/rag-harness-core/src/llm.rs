//! Language-model collaborator traits: generation, reranking, compression.
//!
//! Each trait is the fixed request/response surface of one external
//! service. Implementations hold a constructed client plus its
//! configuration and surface service errors to the caller unmodified —
//! no retry or recovery policy lives behind these traits.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single generation request: one prompt, optional sampling knobs.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Optional system instruction sent ahead of the prompt.
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Trait for completion/generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for the request, returning the full text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// One reranked candidate: its position in the input list and the
/// service's relevance judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    pub score: f32,
}

/// Trait for reranking backends.
///
/// Given a query and candidate texts, returns a reordered, possibly
/// truncated subset (best first), each entry naming the candidate by its
/// original index.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>>;
}

/// Trait for contextual compression backends.
///
/// Given a query and candidate texts, returns the indices of the
/// candidates to retain — in their original order — such that the kept
/// texts fit the service's token budget while preserving salient content.
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(
        &self,
        query: &str,
        candidates: &[String],
        max_tokens: usize,
    ) -> Result<Vec<usize>>;
}
