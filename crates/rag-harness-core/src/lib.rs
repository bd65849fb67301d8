//! # RAG Harness Core
//!
//! Shared, runtime-free logic for RAG Harness: data models, the
//! sliding-window chunker, distance metrics, and the collaborator traits
//! (embedder, vector store, generator, reranker, compressor).
//!
//! This crate contains no tokio, HTTP, filesystem I/O, or other
//! native-only dependencies; concrete service clients live in the
//! `rag-harness` app crate.

pub mod chunk;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod store;
