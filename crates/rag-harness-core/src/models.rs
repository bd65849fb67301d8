//! Core data models used throughout RAG Harness.
//!
//! These types represent the documents and chunks that flow through the
//! indexing and retrieval pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// String-keyed metadata attached to documents and inherited by their chunks.
pub type Metadata = BTreeMap<String, String>;

/// A source document to be chunked and indexed.
///
/// Immutable once constructed: the pipeline reads `text` and `metadata`
/// but never modifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a fresh UUID.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            metadata,
        }
    }

    /// Create a document with a caller-supplied identifier.
    pub fn with_id(id: impl Into<String>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }
}

/// A bounded contiguous span of a document's text, prepared for embedding.
///
/// `text` is an exact byte slice of the parent document covering the range
/// `start..end`. `index` is the chunk's 0-based position within the
/// document; indices are contiguous and chunks are never reordered.
/// `hash` is the SHA-256 of `text`, used for staleness detection when
/// re-indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub index: usize,
    pub text: String,
    /// Byte offset of the chunk's first byte in the document text.
    pub start: usize,
    /// Byte offset one past the chunk's last byte in the document text.
    pub end: usize,
    pub hash: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Build a chunk from a slice of its parent document.
    pub fn new(
        document_id: &str,
        index: usize,
        text: &str,
        start: usize,
        end: usize,
        metadata: Metadata,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            index,
            text: text.to_string(),
            start,
            end,
            hash,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_hash_is_content_addressed() {
        let a = Chunk::new("d1", 0, "same text", 0, 9, Metadata::new());
        let b = Chunk::new("d2", 3, "same text", 12, 21, Metadata::new());
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_document_metadata_roundtrip() {
        let mut meta = Metadata::new();
        meta.insert("path".to_string(), "notes/a.md".to_string());
        let doc = Document::new("body", meta.clone());
        assert_eq!(doc.metadata, meta);
        assert!(!doc.id.is_empty());
    }
}
