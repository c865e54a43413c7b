use crate::error::SearchError;
use crate::models::{SearchMode, SearchQuery, SearchResponse, SearchResult};
use crate::search::aggregate::group_by_type;
use crate::search::keyword::KeywordSearchEngine;
use crate::search::semantic::SemanticSearchEngine;

/// Entry point of the engine: validates the request, runs the requested
/// mode and falls back from semantic to keyword search on provider failures.
pub struct SearchOrchestrator {
    keyword: KeywordSearchEngine,
    semantic: SemanticSearchEngine,
}

impl SearchOrchestrator {
    pub fn new(keyword: KeywordSearchEngine, semantic: SemanticSearchEngine) -> Self {
        Self { keyword, semantic }
    }

    /// The configured vector provider, if any.
    pub fn semantic_provider(&self) -> Option<&str> {
        self.semantic.provider_id()
    }

    pub async fn execute<S: AsRef<str>>(
        &self,
        text: &str,
        mode: SearchMode,
        limit: i64,
        types: Option<&[S]>,
    ) -> Result<SearchResponse, SearchError> {
        let query = SearchQuery::parse(text, mode, limit, types)?;
        self.run(&query).await
    }

    pub async fn run(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let (results, mode, fallback_reason) = match query.mode {
            SearchMode::Keyword => (self.keyword_search(query).await?, SearchMode::Keyword, None),
            SearchMode::Semantic => {
                match self
                    .semantic
                    .search(&query.text, query.limit, &query.types)
                    .await
                {
                    Ok(hits) => {
                        if let Some(best) = hits.first() {
                            tracing::debug!(
                                "Top semantic similarity for '{}': {:.4}",
                                query.text,
                                best.semantic_score
                            );
                        }
                        let results = hits.into_iter().map(SearchResult::from).collect();
                        (results, SearchMode::Semantic, None)
                    }
                    Err(SearchError::VectorProvider(e)) => {
                        tracing::warn!(
                            "Semantic search unavailable (provider '{}'), falling back to keyword: {e}",
                            e.provider
                        );
                        let results = self.keyword_search(query).await?;
                        (results, SearchMode::Keyword, Some(e.to_string()))
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let grouped = group_by_type(&results);
        Ok(SearchResponse {
            query: query.text.clone(),
            mode,
            fallback_reason,
            total_results: results.len(),
            results,
            grouped,
        })
    }

    async fn keyword_search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        self.keyword
            .search(&query.text, query.limit, &query.types)
            .await
    }
}
