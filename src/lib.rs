//! # RAG Harness
//!
//! A retrieval-augmented generation pipeline harness.
//!
//! RAG Harness chunks documents, embeds the chunks through an external
//! embedding service, stores them in a vector database, and answers
//! questions by retrieving, optionally reranking and compressing, and
//! finally generating with an external completion service. An
//! evaluation harness scores the pipeline on a question/answer test set.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ Documents │──▶│  IndexPipeline    │──▶│ Vector store │
//! │ (ingest)  │   │ chunk→embed→upsert│   │  (remote)    │
//! └───────────┘   └──────────────────┘   └──────┬──────┘
//!                                               │
//!        ┌──────────────────────────────────────┤
//!        ▼                                      ▼
//! ┌─────────────────────────────────┐   ┌──────────────┐
//! │          QueryPipeline          │   │  Evaluator   │
//! │ embed→search→rerank→compress→gen│   │ (LLM judge)  │
//! └─────────────────────────────────┘   └──────────────┘
//! ```
//!
//! All similarity search, embedding, generation, reranking, and
//! compression are delegated to external services behind the traits in
//! [`rag_harness_core`]; the only logic this crate owns is the chunker,
//! the stage wiring, and the evaluation scoring.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`embedding`] | HTTP embedding client |
//! | [`generation`] | HTTP completion client (optional streaming) |
//! | [`rerank`] | HTTP reranking client |
//! | [`compress`] | HTTP contextual-compression client |
//! | [`store`] | HTTP vector store client |
//! | [`pipeline`] | Typed index and query pipelines |
//! | [`eval`] | LLM-judged evaluation harness |
//! | [`ingest`] | Filesystem document loading |

pub mod compress;
pub mod config;
pub mod embedding;
pub mod eval;
pub mod generation;
pub mod ingest;
pub mod pipeline;
pub mod rerank;
pub mod store;
