use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SearchError, VectorProviderError};
use crate::models::{
    type_allowed, EntityType, SearchResult, SemanticSearchResult, TypeFilter, VectorMatch,
};
use crate::provider::embeddings::QueryEmbedder;
use crate::provider::ProviderState;
use crate::search::vector::VectorIndex;

#[derive(Debug, Clone)]
pub struct SemanticOptions {
    /// Vector candidates requested per result slot. The index is not
    /// partitioned by type, so filtering happens after retrieval.
    pub over_fetch_factor: usize,
    /// Applied separately to the embedding call and the vector call.
    pub timeout: Duration,
    /// Extra attempts after a provider failure before giving up.
    pub retries: u32,
}

impl Default for SemanticOptions {
    fn default() -> Self {
        Self {
            over_fetch_factor: 2,
            timeout: Duration::from_secs(5),
            retries: 0,
        }
    }
}

/// Collaborators used once a provider has been resolved.
struct Clients {
    embedder: Arc<dyn QueryEmbedder>,
    index: Arc<dyn VectorIndex>,
}

/// Embedding + nearest-neighbour retrieval with type post-filtering.
///
/// Holds the [`ProviderState`] resolved at start-up. Clients exist only
/// for a configured provider.
pub struct SemanticSearchEngine {
    provider: ProviderState,
    clients: Option<Clients>,
    options: SemanticOptions,
}

impl SemanticSearchEngine {
    /// An engine that always reports "no provider configured".
    pub fn unconfigured() -> Self {
        Self {
            provider: ProviderState::Unconfigured,
            clients: None,
            options: SemanticOptions::default(),
        }
    }

    /// Build from a resolved provider. An unconfigured state ignores the
    /// clients.
    pub fn new(
        provider: ProviderState,
        embedder: Arc<dyn QueryEmbedder>,
        index: Arc<dyn VectorIndex>,
        options: SemanticOptions,
    ) -> Self {
        let clients = match provider {
            ProviderState::Unconfigured => None,
            ProviderState::Configured { .. } => Some(Clients { embedder, index }),
        };
        Self {
            provider,
            clients,
            options,
        }
    }

    pub fn configured(
        provider_id: impl Into<String>,
        embedder: Arc<dyn QueryEmbedder>,
        index: Arc<dyn VectorIndex>,
        options: SemanticOptions,
    ) -> Self {
        let provider = ProviderState::Configured {
            provider_id: provider_id.into(),
        };
        Self::new(provider, embedder, index, options)
    }

    pub fn provider_state(&self) -> &ProviderState {
        &self.provider
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider.provider_id()
    }

    pub async fn search(
        &self,
        text: &str,
        limit: usize,
        types: &TypeFilter,
    ) -> Result<Vec<SemanticSearchResult>, SearchError> {
        let (Some(provider_id), Some(Clients { embedder, index })) =
            (self.provider.provider_id(), self.clients.as_ref())
        else {
            return Err(VectorProviderError::unconfigured().into());
        };

        let mut attempt = 0;
        loop {
            match self
                .attempt(provider_id, embedder.as_ref(), index.as_ref(), text, limit, types)
                .await
            {
                Err(SearchError::VectorProvider(e)) if attempt < self.options.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Semantic attempt {attempt} failed on provider '{}': {e}, retrying",
                        e.provider
                    );
                }
                other => return other,
            }
        }
    }

    async fn attempt(
        &self,
        provider_id: &str,
        embedder: &dyn QueryEmbedder,
        index: &dyn VectorIndex,
        text: &str,
        limit: usize,
        types: &TypeFilter,
    ) -> Result<Vec<SemanticSearchResult>, SearchError> {
        let embedding = self
            .bounded(provider_id, "query embedding", embedder.embed(text))
            .await?;

        let k = limit.saturating_mul(self.options.over_fetch_factor.max(1));
        let candidates = self
            .bounded(provider_id, "vector query", index.top_k(&embedding, k))
            .await?;

        let fetched = candidates.len();
        let results: Vec<SemanticSearchResult> = candidates
            .into_iter()
            .filter_map(decode_match)
            .filter(|hit| type_allowed(types, hit.result.entity_type))
            .take(limit)
            .collect();

        tracing::debug!(
            "Semantic search for '{text}' kept {} of {fetched} candidates (k={k})",
            results.len()
        );
        Ok(results)
    }

    /// Run `fut` under the configured timeout; running out of time is a
    /// provider failure like any other.
    async fn bounded<T>(
        &self,
        provider_id: &str,
        operation: &str,
        fut: impl Future<Output = Result<T, SearchError>>,
    ) -> Result<T, SearchError> {
        tokio::time::timeout(self.options.timeout, fut)
            .await
            .map_err(|_| VectorProviderError::timeout(provider_id, operation, self.options.timeout))?
    }
}

fn string_field(metadata: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match metadata.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode one vector match into a result. `id`, `type`, `title` and `slug`
/// are required; `description` defaults to empty and `url` to the canonical
/// page of the record. Returns `None` for anything that does not decode.
pub fn decode_match(m: VectorMatch) -> Option<SemanticSearchResult> {
    if !m.score.is_finite() {
        tracing::debug!("Dropping vector match with non-finite score");
        return None;
    }

    let metadata = &m.metadata;
    let decoded = (|| {
        let id = string_field(metadata, "id")?;
        let entity_type = metadata
            .get("type")
            .and_then(Value::as_str)
            .and_then(EntityType::parse)?;
        let title = string_field(metadata, "title")?;
        let slug = string_field(metadata, "slug")?;
        let description = metadata
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let url = string_field(metadata, "url").unwrap_or_else(|| entity_type.url_for(&slug));
        Some((id, entity_type, title, slug, description, url))
    })();

    let Some((id, entity_type, title, slug, description, url)) = decoded else {
        tracing::debug!("Dropping vector match with malformed metadata: {metadata:?}");
        return None;
    };

    let similarity = m.score.clamp(0.0, 1.0);
    Some(SemanticSearchResult {
        result: SearchResult {
            id,
            entity_type,
            title,
            description,
            slug,
            url,
            score: (similarity * 100.0).round() as u8,
        },
        semantic_score: similarity,
    })
}
