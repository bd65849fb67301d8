//! Indexing and query pipelines.
//!
//! Each pipeline is a fixed, ordered list of typed stages with explicit
//! input/output contracts — no dynamic stage lists, no reflection:
//!
//! ```text
//! IndexPipeline:  Document ──▶ chunk ──▶ embed ──▶ upsert
//! QueryPipeline:  query ──▶ embed ──▶ vector search ──▶ [rerank]
//!                        ──▶ [compress] ──▶ prompt ──▶ generate
//! ```
//!
//! Rerank and compression run only when wired in; each stage consumes
//! exactly the previous stage's output. Collaborators are passed in as
//! trait objects, so the pipelines run identically over HTTP clients and
//! over the in-memory test doubles.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{debug, info};

use rag_harness_core::chunk::Chunker;
use rag_harness_core::embedding::Embedder;
use rag_harness_core::llm::{Compressor, GenerationRequest, Generator, Reranker};
use rag_harness_core::models::Document;
use rag_harness_core::store::{SearchHit, VectorRecord, VectorStore};

/// Counters reported after indexing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub vectors: usize,
}

/// Document ingestion: chunk, embed, upsert.
pub struct IndexPipeline<'a> {
    chunker: Chunker,
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
}

impl<'a> IndexPipeline<'a> {
    pub fn new(chunker: Chunker, embedder: &'a dyn Embedder, store: &'a dyn VectorStore) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Index a single document.
    ///
    /// Documents that chunk to nothing (empty or whitespace-only text)
    /// produce no embedding or store traffic.
    pub async fn index_document(&self, doc: &Document) -> Result<IndexReport> {
        let chunks = self.chunker.split(doc);
        if chunks.is_empty() {
            debug!(document_id = %doc.id, "document produced no chunks");
            return Ok(IndexReport {
                documents: 1,
                ..IndexReport::default()
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            bail!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors.iter())
            .map(|(chunk, vector)| {
                let mut metadata = chunk.metadata.clone();
                metadata.insert("document_id".to_string(), chunk.document_id.clone());
                metadata.insert("chunk_index".to_string(), chunk.index.to_string());
                metadata.insert("hash".to_string(), chunk.hash.clone());
                VectorRecord {
                    id: chunk.id.clone(),
                    vector: vector.clone(),
                    text: chunk.text.clone(),
                    metadata,
                }
            })
            .collect();

        self.store.upsert(&records).await?;
        info!(
            document_id = %doc.id,
            chunks = chunks.len(),
            "indexed document"
        );

        Ok(IndexReport {
            documents: 1,
            chunks: chunks.len(),
            vectors: records.len(),
        })
    }

    /// Index a batch of documents, accumulating one report.
    pub async fn index_documents(&self, docs: &[Document]) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        for doc in docs {
            let one = self.index_document(doc).await?;
            report.documents += one.documents;
            report.chunks += one.chunks;
            report.vectors += one.vectors;
        }
        Ok(report)
    }
}

/// A generated answer plus the contexts it was grounded in.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<SearchHit>,
}

/// Retrieval and answering: embed, search, optionally rerank and
/// compress, then generate.
pub struct QueryPipeline<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    top_k: usize,
    reranker: Option<(&'a dyn Reranker, usize)>,
    compressor: Option<(&'a dyn Compressor, usize)>,
    generator: Option<&'a dyn Generator>,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a dyn VectorStore, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
            reranker: None,
            compressor: None,
            generator: None,
        }
    }

    /// Add a rerank stage keeping the service's `top_n` best candidates.
    pub fn with_reranker(mut self, reranker: &'a dyn Reranker, top_n: usize) -> Self {
        self.reranker = Some((reranker, top_n));
        self
    }

    /// Add a compression stage with a context token budget.
    pub fn with_compressor(mut self, compressor: &'a dyn Compressor, max_tokens: usize) -> Self {
        self.compressor = Some((compressor, max_tokens));
        self
    }

    /// Add the generation stage used by [`QueryPipeline::ask`].
    pub fn with_generator(mut self, generator: &'a dyn Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Run the retrieval stages and return ranked context chunks.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_query(query).await?;
        let mut hits = self.store.query(&query_vec, self.top_k).await?;
        debug!(candidates = hits.len(), "vector search complete");

        if let Some((reranker, top_n)) = self.reranker {
            let texts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
            let reranked = reranker.rerank(query, &texts, top_n).await?;
            let mut reordered = Vec::with_capacity(reranked.len());
            for r in reranked {
                let mut hit = hits[r.index].clone();
                hit.score = r.score;
                reordered.push(hit);
            }
            hits = reordered;
            debug!(kept = hits.len(), "rerank complete");
        }

        if let Some((compressor, max_tokens)) = self.compressor {
            let texts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
            let kept = compressor.compress(query, &texts, max_tokens).await?;
            let retained: Vec<_> = kept.into_iter().map(|i| hits[i].clone()).collect();
            hits = retained;
            debug!(kept = hits.len(), "compression complete");
        }

        Ok(hits)
    }

    /// Retrieve contexts and generate a grounded answer.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        let generator = match self.generator {
            Some(g) => g,
            None => bail!("No generator configured for this pipeline"),
        };

        let contexts = self.retrieve(query).await?;
        let request = build_prompt(query, &contexts);
        let text = generator.generate(&request).await?;

        Ok(Answer { text, contexts })
    }
}

/// Build the generation request for a query and its retrieved contexts.
///
/// The prompt numbers each context block so answers can cite them; the
/// system instruction pins the model to the provided context.
pub fn build_prompt(query: &str, contexts: &[SearchHit]) -> GenerationRequest {
    let mut prompt = String::from("Context:\n");
    if contexts.is_empty() {
        prompt.push_str("(no context retrieved)\n");
    }
    for (i, hit) in contexts.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, hit.text.trim()));
    }
    prompt.push_str(&format!("\nQuestion: {}\n\nAnswer:", query));

    GenerationRequest {
        prompt,
        system: Some(
            "Answer the question using only the provided context. \
             If the context does not contain the answer, say you do not know."
                .to_string(),
        ),
        temperature: None,
        max_tokens: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_harness_core::models::Metadata;

    fn hit(text: &str) -> SearchHit {
        SearchHit {
            id: "c1".to_string(),
            score: 0.9,
            text: text.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_prompt_numbers_contexts() {
        let request = build_prompt("What is Rust?", &[hit("Rust is a language."), hit("Crabs.")]);
        assert!(request.prompt.contains("[1] Rust is a language."));
        assert!(request.prompt.contains("[2] Crabs."));
        assert!(request.prompt.contains("Question: What is Rust?"));
        assert!(request.system.is_some());
    }

    #[test]
    fn test_prompt_without_contexts() {
        let request = build_prompt("anything", &[]);
        assert!(request.prompt.contains("(no context retrieved)"));
    }
}
