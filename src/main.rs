//! # RAG Harness CLI (`rag`)
//!
//! The `rag` binary drives the full pipeline: indexing a directory of
//! documents, retrieving context for a query, answering questions, and
//! evaluating answer quality on a test set.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag index <path>` | Chunk, embed, and upsert every matching file under `<path>` |
//! | `rag search "<query>"` | Retrieve ranked context chunks for a query |
//! | `rag ask "<query>"` | Retrieve context and generate a grounded answer |
//! | `rag eval <testset.json>` | Score the pipeline on a question/answer test set |
//!
//! ## Examples
//!
//! ```bash
//! # Index a local docs directory
//! rag index ./docs --config ./config/rag.toml
//!
//! # Inspect what retrieval returns
//! rag search "how is the cache invalidated" --limit 5
//!
//! # Ask with token-by-token output
//! rag ask "how is the cache invalidated" --stream
//!
//! # Evaluate and write the report
//! rag eval testset.json --output report.json
//! ```

mod compress;
mod config;
mod embedding;
mod eval;
mod generation;
mod ingest;
mod pipeline;
mod rerank;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use rag_harness_core::chunk::Chunker;

use crate::compress::HttpCompressor;
use crate::config::Config;
use crate::embedding::HttpEmbedder;
use crate::eval::{CaseAnswer, Evaluator};
use crate::generation::HttpGenerator;
use crate::pipeline::{build_prompt, IndexPipeline, QueryPipeline};
use crate::rerank::HttpReranker;
use crate::store::HttpVectorStore;

/// RAG Harness CLI — index documents, retrieve context, answer
/// questions, and evaluate the pipeline.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "RAG Harness — a retrieval-augmented generation pipeline harness",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and upsert documents from a directory.
    ///
    /// Files are selected by the configured include/exclude globs,
    /// chunked with the configured window and overlap, embedded in
    /// batches, and upserted into the vector store.
    Index {
        /// Directory to ingest.
        path: PathBuf,
    },

    /// Retrieve ranked context chunks for a query.
    ///
    /// Runs the retrieval stages only (embed, search, and any enabled
    /// rerank/compression stages) and prints the surviving chunks.
    Search {
        /// The query string.
        query: String,

        /// Maximum candidates fetched from the store.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Retrieve context and generate a grounded answer.
    Ask {
        /// The question.
        query: String,

        /// Print tokens as they stream from the generation service.
        #[arg(long)]
        stream: bool,
    },

    /// Evaluate the pipeline on a JSON test set.
    ///
    /// Each case's question is answered by the full pipeline; the
    /// generation service then judges faithfulness, relevancy, and
    /// correctness.
    Eval {
        /// Path to the test set (JSON array of cases).
        testset: PathBuf,

        /// Write the full report as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { path } => run_index(&config, &path).await,
        Commands::Search { query, limit } => run_search(&config, &query, limit).await,
        Commands::Ask { query, stream } => run_ask(&config, &query, stream).await,
        Commands::Eval { testset, output } => run_eval(&config, &testset, output.as_deref()).await,
    }
}

async fn run_index(config: &Config, path: &PathBuf) -> Result<()> {
    let chunker = Chunker::new(config.chunking.max_tokens, config.chunking.overlap_tokens)?;
    let embedder = HttpEmbedder::new(&config.embedding)?;
    let store = HttpVectorStore::new(&config.store)?;
    store.ensure_collection(config.embedding.dims).await?;

    let documents = ingest::scan_directory(path, &config.ingest)?;
    let pipeline = IndexPipeline::new(chunker, &embedder, &store);
    let report = pipeline.index_documents(&documents).await?;

    println!("index {}", path.display());
    println!("  documents: {}", report.documents);
    println!("  chunks: {}", report.chunks);
    println!("  vectors: {}", report.vectors);
    println!("ok");
    Ok(())
}

async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let embedder = HttpEmbedder::new(&config.embedding)?;
    let store = HttpVectorStore::new(&config.store)?;
    let reranker = optional_reranker(config)?;
    let compressor = optional_compressor(config)?;

    let mut pipeline = QueryPipeline::new(
        &embedder,
        &store,
        limit.unwrap_or(config.retrieval.top_k),
    );
    if let Some(r) = &reranker {
        pipeline = pipeline.with_reranker(r, config.rerank.top_n);
    }
    if let Some(c) = &compressor {
        pipeline = pipeline.with_compressor(c, config.compression.max_tokens);
    }

    let hits = pipeline.retrieve(query).await?;
    if hits.is_empty() {
        println!("no results");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.4}] {}",
            i + 1,
            hit.score,
            hit.metadata.get("path").map(|s| s.as_str()).unwrap_or("-")
        );
        println!("   {}", snippet(&hit.text));
    }
    Ok(())
}

async fn run_ask(config: &Config, query: &str, stream: bool) -> Result<()> {
    let embedder = HttpEmbedder::new(&config.embedding)?;
    let store = HttpVectorStore::new(&config.store)?;
    let generator = HttpGenerator::new(&config.generation)?;
    let reranker = optional_reranker(config)?;
    let compressor = optional_compressor(config)?;

    let mut pipeline = QueryPipeline::new(&embedder, &store, config.retrieval.top_k);
    if let Some(r) = &reranker {
        pipeline = pipeline.with_reranker(r, config.rerank.top_n);
    }
    if let Some(c) = &compressor {
        pipeline = pipeline.with_compressor(c, config.compression.max_tokens);
    }

    let contexts = if stream {
        let contexts = pipeline.retrieve(query).await?;
        let request = build_prompt(query, &contexts);
        let mut stdout = std::io::stdout();
        generator
            .generate_streaming(&request, &mut |token| {
                print!("{}", token);
                let _ = stdout.flush();
            })
            .await?;
        println!();
        contexts
    } else {
        let pipeline = pipeline.with_generator(&generator);
        let answer = pipeline.ask(query).await?;
        println!("{}", answer.text);
        answer.contexts
    };

    if !contexts.is_empty() {
        println!();
        println!("sources:");
        for hit in &contexts {
            println!(
                "  - {}",
                hit.metadata
                    .get("path")
                    .map(|s| s.as_str())
                    .unwrap_or(hit.id.as_str())
            );
        }
    }
    Ok(())
}

async fn run_eval(config: &Config, testset: &PathBuf, output: Option<&std::path::Path>) -> Result<()> {
    let embedder = HttpEmbedder::new(&config.embedding)?;
    let store = HttpVectorStore::new(&config.store)?;
    let generator = HttpGenerator::new(&config.generation)?;
    let reranker = optional_reranker(config)?;
    let compressor = optional_compressor(config)?;

    let mut pipeline = QueryPipeline::new(&embedder, &store, config.retrieval.top_k);
    if let Some(r) = &reranker {
        pipeline = pipeline.with_reranker(r, config.rerank.top_n);
    }
    if let Some(c) = &compressor {
        pipeline = pipeline.with_compressor(c, config.compression.max_tokens);
    }
    let pipeline = pipeline.with_generator(&generator);

    let cases = eval::load_test_set(testset)?;
    let evaluator = Evaluator::new(&generator);
    let report = evaluator
        .evaluate(&cases, |case| {
            let question = case.question.clone();
            let pipeline = &pipeline;
            async move {
                let answer = pipeline.ask(&question).await?;
                Ok(CaseAnswer {
                    answer: answer.text,
                    contexts: answer.contexts.into_iter().map(|h| h.text).collect(),
                })
            }
        })
        .await?;

    println!("eval {} ({} cases)", testset.display(), report.cases.len());
    for (metric, mean) in &report.means {
        println!("  {}: {:.3}", metric, mean);
    }

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("report written to {}", path.display());
    }
    println!("ok");
    Ok(())
}

fn optional_reranker(config: &Config) -> Result<Option<HttpReranker>> {
    if config.rerank.enabled {
        Ok(Some(HttpReranker::new(&config.rerank)?))
    } else {
        Ok(None)
    }
}

fn optional_compressor(config: &Config) -> Result<Option<HttpCompressor>> {
    if config.compression.enabled {
        Ok(Some(HttpCompressor::new(&config.compression)?))
    } else {
        Ok(None)
    }
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(160).collect()
}
