//! Configuration types for the indexing pipelines.
//!
//! Pipeline behaviour is controlled through [`IndexingConfig`], built via its
//! [`IndexingConfigBuilder`]. Connection endpoints live in [`Settings`],
//! which is read once from the environment (after `dotenvy::dotenv()`), so a
//! `.env` file next to the binary configures every store and service.

use crate::error::MultidexError;
use crate::progress::IndexProgress;
use std::fmt;
use std::sync::Arc;

/// Rendering resolution for PDF pages, in dots per inch.
pub const DEFAULT_DPI: u32 = 300;

/// Configuration for a pipeline run.
///
/// Built via [`IndexingConfig::builder()`] or [`IndexingConfig::default()`].
///
/// # Example
/// ```rust
/// use multidex::IndexingConfig;
///
/// let config = IndexingConfig::builder()
///     .concurrency(4)
///     .chunk_size(1000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IndexingConfig {
    /// Rendering DPI used when rasterizing PDF pages. Range: 72–600.
    /// Default: 300.
    pub dpi: u32,

    /// Number of documents processed concurrently. Default: 8.
    ///
    /// Embedding and extraction are network-bound; splitting runs on the
    /// blocking thread pool. The splitter itself is pure and safe to invoke
    /// from any number of workers at once.
    pub concurrency: usize,

    /// Target chunk size in bytes for the text pipeline. Default: 2000.
    pub chunk_size: usize,

    /// Overlap carried between consecutive chunks, in bytes. Default: 500.
    /// Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,

    /// Filename patterns to index (`*.md` style suffix globs). Empty means
    /// every file. Default: empty.
    pub included_patterns: Vec<String>,

    /// Maximum retry attempts for a transient embedding/extraction failure.
    /// Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds; doubles after each attempt.
    /// Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for embedding/extraction calls, in seconds.
    /// Default: 60.
    pub request_timeout_secs: u64,

    /// Optional observer notified as documents complete.
    pub progress: Option<Arc<dyn IndexProgress>>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            concurrency: 8,
            chunk_size: 2000,
            chunk_overlap: 500,
            included_patterns: Vec::new(),
            max_retries: 3,
            retry_backoff_ms: 500,
            request_timeout_secs: 60,
            progress: None,
        }
    }
}

impl fmt::Debug for IndexingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingConfig")
            .field("dpi", &self.dpi)
            .field("concurrency", &self.concurrency)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("included_patterns", &self.included_patterns)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn IndexProgress>"))
            .finish()
    }
}

impl IndexingConfig {
    /// Create a new builder for `IndexingConfig`.
    pub fn builder() -> IndexingConfigBuilder {
        IndexingConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IndexingConfig`].
#[derive(Debug)]
pub struct IndexingConfigBuilder {
    config: IndexingConfig,
}

impl IndexingConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes.max(1);
        self
    }

    pub fn chunk_overlap(mut self, bytes: usize) -> Self {
        self.config.chunk_overlap = bytes;
        self
    }

    pub fn included_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.included_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn progress(mut self, observer: Arc<dyn IndexProgress>) -> Self {
        self.config.progress = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IndexingConfig, MultidexError> {
        let c = &self.config;
        if c.chunk_overlap >= c.chunk_size {
            return Err(MultidexError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        Ok(self.config)
    }
}

// ── Connection settings ──────────────────────────────────────────────────

/// Store and service endpoints, read from the environment.
///
/// Optional values stay `None` until the pipeline that needs them asks, so a
/// page-indexing run does not require a Postgres URL and vice versa.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string (`MULTIDEX_DATABASE_URL`, falling back to
    /// `DATABASE_URL`).
    pub database_url: Option<String>,
    /// Table for text-chunk embeddings. Default: `doc_chunks`.
    pub doc_table: String,
    /// Qdrant endpoint. Default: `http://localhost:6334`.
    pub qdrant_url: String,
    /// Qdrant collection for page embeddings. Default: `multi_format_pages`.
    pub qdrant_collection: String,
    /// Neo4j bolt URI. Default: `bolt://localhost:7687`.
    pub neo4j_uri: String,
    /// Neo4j user. Default: `neo4j`.
    pub neo4j_user: String,
    /// Neo4j password (`MULTIDEX_NEO4J_PASSWORD`, no default).
    pub neo4j_password: Option<String>,
    /// Base URL of the embedding server. Default: `http://localhost:8000`.
    pub embedding_url: String,
    /// Text embedding model. Default: `sentence-transformers/all-MiniLM-L6-v2`.
    pub text_model: String,
    /// Dimensionality of text embeddings. Default: 384.
    pub text_dim: usize,
    /// Late-interaction image embedding model. Default: `vidore/colpali-v1.2`.
    pub image_model: String,
    /// Dimensionality of each image embedding vector. Default: 128.
    pub image_dim: usize,
    /// OpenAI-compatible chat endpoint for extraction.
    /// Default: `https://api.openai.com/v1`.
    pub llm_url: String,
    /// Extraction model. Default: `gpt-4o`.
    pub llm_model: String,
    /// API key for the chat endpoint (`MULTIDEX_LLM_API_KEY`, falling back
    /// to `OPENAI_API_KEY`).
    pub llm_api_key: Option<String>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| std::env::var(n).ok().filter(|v| !v.is_empty()))
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    /// Read every setting from the environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should participate.
    pub fn from_env() -> Self {
        Self {
            database_url: env_opt(&["MULTIDEX_DATABASE_URL", "DATABASE_URL"]),
            doc_table: env_or("MULTIDEX_DOC_TABLE", "doc_chunks"),
            qdrant_url: env_or("MULTIDEX_QDRANT_URL", "http://localhost:6334"),
            qdrant_collection: env_or("MULTIDEX_QDRANT_COLLECTION", "multi_format_pages"),
            neo4j_uri: env_or("MULTIDEX_NEO4J_URI", "bolt://localhost:7687"),
            neo4j_user: env_or("MULTIDEX_NEO4J_USER", "neo4j"),
            neo4j_password: env_opt(&["MULTIDEX_NEO4J_PASSWORD"]),
            embedding_url: env_or("MULTIDEX_EMBEDDING_URL", "http://localhost:8000"),
            text_model: env_or(
                "MULTIDEX_TEXT_MODEL",
                "sentence-transformers/all-MiniLM-L6-v2",
            ),
            text_dim: env_usize("MULTIDEX_TEXT_DIM", 384),
            image_model: env_or("MULTIDEX_IMAGE_MODEL", "vidore/colpali-v1.2"),
            image_dim: env_usize("MULTIDEX_IMAGE_DIM", 128),
            llm_url: env_or("MULTIDEX_LLM_URL", "https://api.openai.com/v1"),
            llm_model: env_or("MULTIDEX_LLM_MODEL", "gpt-4o"),
            llm_api_key: env_opt(&["MULTIDEX_LLM_API_KEY", "OPENAI_API_KEY"]),
        }
    }

    /// Postgres connection string, or a [`MultidexError::MissingEnv`] naming
    /// the variable to set.
    pub fn database_url(&self) -> Result<&str, MultidexError> {
        self.database_url
            .as_deref()
            .ok_or(MultidexError::MissingEnv {
                name: "MULTIDEX_DATABASE_URL",
                purpose: "Postgres connection string",
            })
    }

    /// Neo4j password, or a [`MultidexError::MissingEnv`].
    pub fn neo4j_password(&self) -> Result<&str, MultidexError> {
        self.neo4j_password
            .as_deref()
            .ok_or(MultidexError::MissingEnv {
                name: "MULTIDEX_NEO4J_PASSWORD",
                purpose: "Neo4j password",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = IndexingConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.chunk_size, 2000);
        assert_eq!(c.chunk_overlap, 500);
        assert!(c.included_patterns.is_empty());
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = IndexingConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        let c = IndexingConfig::builder().dpi(10_000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn builder_rejects_overlap_ge_size() {
        let err = IndexingConfig::builder()
            .chunk_size(100)
            .chunk_overlap(100)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn concurrency_floor_is_one() {
        let c = IndexingConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn database_url_missing_is_reported() {
        let s = Settings {
            database_url: None,
            doc_table: "doc_chunks".into(),
            qdrant_url: String::new(),
            qdrant_collection: String::new(),
            neo4j_uri: String::new(),
            neo4j_user: String::new(),
            neo4j_password: None,
            embedding_url: String::new(),
            text_model: String::new(),
            text_dim: 384,
            image_model: String::new(),
            image_dim: 128,
            llm_url: String::new(),
            llm_model: String::new(),
            llm_api_key: None,
        };
        assert!(s.database_url().is_err());
    }
}
