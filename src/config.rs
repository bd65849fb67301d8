use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use rag_harness_core::embedding::DistanceMetric;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    256
}
fn default_overlap_tokens() -> usize {
    32
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Environment variable the API key is read from at client construction.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_openai_key_env(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    /// Optional environment variable holding the store's API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            api_key_env: None,
            collection: default_collection(),
            metric: DistanceMetric::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "rag_harness".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_openai_key_env(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_generation_max_tokens(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_generation_max_tokens() -> u32 {
    1024
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rerank_url")]
    pub base_url: String,
    #[serde(default = "default_rerank_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_rerank_model")]
    pub model: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_rerank_url(),
            api_key_env: default_rerank_key_env(),
            model: default_rerank_model(),
            top_n: default_top_n(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_rerank_url() -> String {
    "https://api.cohere.com/v2".to_string()
}
fn default_rerank_key_env() -> String {
    "COHERE_API_KEY".to_string()
}
fn default_rerank_model() -> String {
    "rerank-v3.5".to_string()
}
fn default_top_n() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompressionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_compression_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_compression_model")]
    pub model: String,
    /// Token budget for the compressed context set.
    #[serde(default = "default_compression_budget")]
    pub max_tokens: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_compression_url(),
            api_key_env: None,
            model: default_compression_model(),
            max_tokens: default_compression_budget(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_compression_url() -> String {
    "http://localhost:8890".to_string()
}
fn default_compression_model() -> String {
    "llmlingua-2".to_string()
}
fn default_compression_budget() -> usize {
    512
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of candidates fetched from the vector store.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.max_tokens {
        anyhow::bail!(
            "chunking.overlap_tokens ({}) must be < chunking.max_tokens ({})",
            config.chunking.overlap_tokens,
            config.chunking.max_tokens
        );
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.rerank.enabled && config.rerank.top_n == 0 {
        anyhow::bail!("rerank.top_n must be >= 1 when rerank is enabled");
    }
    if config.compression.enabled && config.compression.max_tokens == 0 {
        anyhow::bail!("compression.max_tokens must be > 0 when compression is enabled");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.chunking.max_tokens, 256);
        assert_eq!(config.chunking.overlap_tokens, 32);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.store.metric, DistanceMetric::Cosine);
        assert!(!config.rerank.enabled);
        assert!(!config.compression.enabled);
        assert_eq!(config.retrieval.top_k, 8);
    }

    #[test]
    fn test_metric_parses_from_kebab_case() {
        let config: Config = toml::from_str(
            r#"
            [store]
            metric = "inner-product"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.metric, DistanceMetric::InnerProduct);
    }

    #[test]
    fn test_overlap_ge_max_rejected() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            max_tokens = 16
            overlap_tokens = 16
            "#,
        )
        .unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("overlap_tokens"));
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            max_tokens = 0
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rerank_section_overrides() {
        let config: Config = toml::from_str(
            r#"
            [rerank]
            enabled = true
            top_n = 6
            "#,
        )
        .unwrap();
        validate(&config).unwrap();
        assert!(config.rerank.enabled);
        assert_eq!(config.rerank.top_n, 6);
        assert_eq!(config.rerank.model, "rerank-v3.5");
    }
}
