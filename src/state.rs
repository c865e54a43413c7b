use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, KeywordBackend};
use crate::provider::cache::CachedEmbedder;
use crate::provider::embeddings::{HttpEmbedder, QueryEmbedder};
use crate::provider::{resolve_provider, ProviderState, LOCAL_PROVIDER};
use crate::search::bm25::{bm25_repositories, ContentIndex};
use crate::search::content::{load_content, substring_repositories};
use crate::search::keyword::KeywordSearchEngine;
use crate::search::orchestrator::SearchOrchestrator;
use crate::search::semantic::{SemanticOptions, SemanticSearchEngine};
use crate::search::vector::{HttpVectorIndex, LocalVectorIndex, VectorIndex};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<SearchOrchestrator>,
    /// Number of records in the content export at start-up
    pub content_records: usize,
    /// Set when the local vector provider is active, for periodic reloads
    pub local_vectors: Option<Arc<LocalVectorIndex>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let records = load_content(&config.content_path())?;
        let published = records.iter().filter(|r| r.published).count();
        tracing::info!(
            "Loaded {} content records ({published} published)",
            records.len()
        );

        let repositories = match config.keyword_backend {
            KeywordBackend::Bm25 => {
                let index = Arc::new(ContentIndex::open_or_create(&config.index_dir())?);
                let indexed = index.rebuild(&records)?;
                tracing::info!("Keyword index rebuilt with {indexed} documents");
                bm25_repositories(index)
            }
            KeywordBackend::Substring => substring_repositories(&records),
        };
        let keyword = KeywordSearchEngine::new(repositories);

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let mut local_vectors = None;
        let provider = resolve_provider(&config.vector);
        let semantic = match &provider {
            ProviderState::Unconfigured => {
                match config.vector.provider.as_deref() {
                    Some(raw) if !raw.trim().is_empty() => {
                        tracing::warn!("Unknown vector provider '{raw}', semantic search disabled")
                    }
                    _ => tracing::info!("No vector provider configured, semantic search disabled"),
                }
                SemanticSearchEngine::unconfigured()
            }
            ProviderState::Configured { provider_id } => {
                let index: Arc<dyn VectorIndex> = if provider_id.as_str() == LOCAL_PROVIDER {
                    let local = Arc::new(LocalVectorIndex::open(&config.vectors_path())?);
                    tracing::info!("Local vector index loaded with {} entries", local.entry_count());
                    local_vectors = Some(local.clone());
                    local
                } else {
                    Arc::new(HttpVectorIndex::new(
                        http_client.clone(),
                        config.vector.url.clone(),
                        config.vector.token.clone(),
                    ))
                };

                let mut embedder: Arc<dyn QueryEmbedder> =
                    Arc::new(HttpEmbedder::new(http_client.clone(), config.embedding.clone()));
                if config.search.embedding_cache_ttl_secs > 0 {
                    embedder = Arc::new(CachedEmbedder::new(
                        embedder,
                        provider_id.clone(),
                        Duration::from_secs(config.search.embedding_cache_ttl_secs),
                        config.search.embedding_cache_capacity,
                    ));
                }

                tracing::info!(
                    "Semantic search enabled: vector provider '{provider_id}', embeddings via {} ({})",
                    config.embedding.provider,
                    config.embedding.model
                );

                let options = SemanticOptions {
                    over_fetch_factor: config.search.over_fetch_factor,
                    timeout: config.search.provider_timeout(),
                    retries: config.search.semantic_retries,
                };
                SemanticSearchEngine::new(provider.clone(), embedder, index, options)
            }
        };

        Ok(Self {
            config,
            orchestrator: Arc::new(SearchOrchestrator::new(keyword, semantic)),
            content_records: records.len(),
            local_vectors,
        })
    }

    /// Assemble state from an already-built orchestrator.
    pub fn from_parts(config: Config, orchestrator: SearchOrchestrator, content_records: usize) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            content_records,
            local_vectors: None,
        }
    }
}
