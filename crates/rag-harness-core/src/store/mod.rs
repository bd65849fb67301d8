//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait defines the two operations the pipeline
//! needs from a vector database — upsert and nearest-neighbor query —
//! enabling pluggable backends (remote HTTP stores, the in-memory store
//! used in tests).
//!
//! Similarity search itself is the store's responsibility; callers only
//! see ranked [`SearchHit`]s, higher score first, under whatever
//! [`DistanceMetric`](crate::embedding::DistanceMetric) the store was
//! configured with.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Metadata;

/// One stored item: id, embedding vector, source text, and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A ranked query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Rank-ordering score under the store's metric; higher is better.
    pub score: f32,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Abstract vector store backend.
///
/// Implementations must be `Send + Sync` to work with async runtimes.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by id.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return the `top_k` stored items nearest to `vector`, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;
}
