//! In-memory [`VectorStore`] implementation for testing.
//!
//! Keeps records in a `Vec` behind `std::sync::RwLock` and answers
//! queries with an exact brute-force scan under the configured metric —
//! no index structure, so results are a ground truth to compare remote
//! backends against.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::DistanceMetric;

use super::{SearchHit, VectorRecord, VectorStore};

/// Exact-scan in-memory store.
pub struct InMemoryStore {
    metric: DistanceMetric,
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryStore {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DistanceMetric::Cosine)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let stored = self.records.read().unwrap();
        let mut hits: Vec<SearchHit> = stored
            .iter()
            .map(|r| SearchHit {
                id: r.id.clone(),
                score: self.metric.score(vector, &r.vector),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn record(id: &str, vector: Vec<f32>, text: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            text: text.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_cosine() {
        let store = InMemoryStore::new(DistanceMetric::Cosine);
        store
            .upsert(&[
                record("a", vec![1.0, 0.0], "aligned"),
                record("b", vec![0.0, 1.0], "orthogonal"),
                record("c", vec![-1.0, 0.0], "opposite"),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_query_ranks_by_l2() {
        let store = InMemoryStore::new(DistanceMetric::L2);
        store
            .upsert(&[
                record("near", vec![1.0, 1.0], ""),
                record("far", vec![10.0, 10.0], ""),
            ])
            .await
            .unwrap();

        let hits = store.query(&[0.0, 0.0], 10).await.unwrap();
        assert_eq!(hits[0].id, "near");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryStore::default();
        store
            .upsert(&[record("x", vec![1.0, 0.0], "old")])
            .await
            .unwrap();
        store
            .upsert(&[record("x", vec![0.0, 1.0], "new")])
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let hits = store.query(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].text, "new");
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_hits() {
        let store = InMemoryStore::default();
        let hits = store.query(&[1.0, 2.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
