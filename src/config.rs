use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the content export, keyword index and vector export live
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Which keyword repository implementation to use
    pub keyword_backend: KeywordBackend,
    /// Vector index configuration
    pub vector: VectorConfig,
    /// Query embedding API configuration
    pub embedding: EmbeddingConfig,
    /// Search tuning knobs
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordBackend {
    /// tantivy BM25 index rebuilt from the content export
    Bm25,
    /// Case-insensitive substring matching over the content export
    Substring,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorConfig {
    /// "local", "http", or None for no semantic search
    pub provider: Option<String>,
    /// Base URL of the REST vector index (http provider only)
    pub url: Option<String>,
    /// Bearer token for the REST vector index
    pub token: Option<String>,
    /// Re-read the local vector export this often (0 = never)
    pub reload_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" or "ollama"
    pub provider: String,
    /// Base URL for the embedding API
    pub base_url: String,
    /// Model name for query embeddings
    pub model: String,
    /// API key (required for openai)
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Limit used when the request omits one or sends garbage
    pub default_limit: i64,
    /// Timeout applied to the embedding call and to the vector call
    pub provider_timeout_secs: u64,
    /// How many times a failed semantic attempt is retried before falling back
    pub semantic_retries: u32,
    /// Vector candidates requested per result slot
    pub over_fetch_factor: usize,
    /// Query-embedding cache TTL (0 disables the cache)
    pub embedding_cache_ttl_secs: u64,
    /// Query-embedding cache capacity
    pub embedding_cache_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            keyword_backend: KeywordBackend::Bm25,
            vector: VectorConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            provider_timeout_secs: 5,
            semantic_retries: 0,
            over_fetch_factor: 2,
            embedding_cache_ttl_secs: 600,
            embedding_cache_capacity: 1_000,
        }
    }
}

impl SearchConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("BIBLE_SEARCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("BIBLE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(backend) = std::env::var("BIBLE_SEARCH_KEYWORD_BACKEND") {
            match backend.trim().to_ascii_lowercase().as_str() {
                "bm25" => config.keyword_backend = KeywordBackend::Bm25,
                "substring" => config.keyword_backend = KeywordBackend::Substring,
                other => tracing::warn!("Ignoring unknown keyword backend '{other}'"),
            }
        }

        // Vector index
        if let Ok(provider) = std::env::var("VECTOR_PROVIDER") {
            config.vector.provider = Some(provider);
        }
        if let Ok(url) = std::env::var("VECTOR_INDEX_URL") {
            config.vector.url = Some(url);
        }
        if let Ok(token) = std::env::var("VECTOR_INDEX_TOKEN") {
            config.vector.token = Some(token);
        }
        if let Ok(val) = std::env::var("VECTOR_RELOAD_INTERVAL_SECS") {
            if let Ok(v) = val.parse() {
                config.vector.reload_interval_secs = v;
            }
        }

        // Embedding API
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            if !key.trim().is_empty() {
                config.embedding.api_key = Some(key);
            }
        }

        // Search tuning
        if let Ok(val) = std::env::var("SEARCH_DEFAULT_LIMIT") {
            if let Ok(v) = val.parse() {
                config.search.default_limit = v;
            }
        }
        if let Ok(val) = std::env::var("SEARCH_PROVIDER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.search.provider_timeout_secs = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("SEARCH_SEMANTIC_RETRIES") {
            if let Ok(v) = val.parse::<u32>() {
                config.search.semantic_retries = v.min(3); // Cap at 3
            }
        }
        if let Ok(val) = std::env::var("SEARCH_OVER_FETCH_FACTOR") {
            if let Ok(v) = val.parse::<usize>() {
                config.search.over_fetch_factor = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("SEARCH_EMBEDDING_CACHE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.search.embedding_cache_ttl_secs = v;
            }
        }
        if let Ok(val) = std::env::var("SEARCH_EMBEDDING_CACHE_CAPACITY") {
            if let Ok(v) = val.parse() {
                config.search.embedding_cache_capacity = v;
            }
        }

        config
    }

    pub fn content_path(&self) -> PathBuf {
        self.data_dir.join("content.json")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.data_dir.join("vectors.json")
    }
}
