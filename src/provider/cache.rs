//! Query-embedding cache.
//!
//! Wraps any [`QueryEmbedder`] so repeated identical queries skip the
//! embedding API. Entries are keyed by `(normalized text, provider id)` and
//! expire after a fixed TTL. Only successful embeddings are cached.
//!
//! Normalization only shapes the key. On a miss the wrapped embedder gets
//! the caller's text, so the first spelling seen fills the entry.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::embeddings::QueryEmbedder;
use crate::error::SearchError;

type CacheKey = (String, String);

pub struct CachedEmbedder {
    inner: Arc<dyn QueryEmbedder>,
    provider_id: String,
    cache: Cache<CacheKey, Arc<Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(
        inner: Arc<dyn QueryEmbedder>,
        provider_id: impl Into<String>,
        ttl: Duration,
        capacity: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            provider_id: provider_id.into(),
            cache,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Lowercase and collapse whitespace so trivially different spellings of
/// the same query share an entry.
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[async_trait]
impl QueryEmbedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let normalized = normalize_query(text);
        let key = (normalized, self.provider_id.clone());

        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("Query embedding cache hit for '{}'", key.0);
            return Ok(hit.as_ref().clone());
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.insert(key, Arc::new(embedding.clone())).await;
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorProviderError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryEmbedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(text.to_string());
            if self.fail {
                return Err(VectorProviderError::new("fake", "upstream down").into());
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn cached(inner: Arc<CountingEmbedder>, ttl: Duration) -> CachedEmbedder {
        CachedEmbedder::new(inner, "local", ttl, 100)
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Faith   and\tHope "), "faith and hope");
    }

    #[tokio::test]
    async fn test_repeated_query_hits_cache() {
        let inner = Arc::new(CountingEmbedder::default());
        let embedder = cached(inner.clone(), Duration::from_secs(60));

        let first = embedder.embed("Faith").await.unwrap();
        let second = embedder.embed("  faith ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_receives_original_text() {
        let inner = Arc::new(CountingEmbedder::default());
        let embedder = cached(inner.clone(), Duration::from_secs(60));

        embedder.embed("  The LORD is my Shepherd ").await.unwrap();
        embedder.embed("the lord is my shepherd").await.unwrap();

        assert_eq!(*inner.seen.lock(), vec!["  The LORD is my Shepherd ".to_string()]);
    }

    #[tokio::test]
    async fn test_distinct_queries_miss_cache() {
        let inner = Arc::new(CountingEmbedder::default());
        let embedder = cached(inner.clone(), Duration::from_secs(60));

        embedder.embed("faith").await.unwrap();
        embedder.embed("hope").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(CountingEmbedder {
            fail: true,
            ..CountingEmbedder::default()
        });
        let embedder = cached(inner.clone(), Duration::from_secs(60));

        assert!(embedder.embed("faith").await.is_err());
        assert!(embedder.embed("faith").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let inner = Arc::new(CountingEmbedder::default());
        let embedder = cached(inner.clone(), Duration::from_millis(20));

        embedder.embed("faith").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        embedder.embed("faith").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
