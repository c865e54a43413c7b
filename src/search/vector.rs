use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SearchError, VectorProviderError};
use crate::models::VectorMatch;
use crate::provider::{HTTP_PROVIDER, LOCAL_PROVIDER};

/// Nearest-neighbour lookup over pre-computed content embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` matches ordered by descending similarity.
    async fn top_k(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, SearchError>;
}

// ─── Local index ─────────────────────────────────────────

/// One entry of the offline job's export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// In-memory vector index with cosine similarity, loaded from the export
/// written by the offline indexing job.
pub struct LocalVectorIndex {
    entries: RwLock<Vec<VectorEntry>>,
    source: Option<PathBuf>,
}

impl LocalVectorIndex {
    pub fn from_entries(entries: Vec<VectorEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            source: None,
        }
    }

    /// Load the export at `path`. A missing file yields an empty index.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = read_export(path)?;
        Ok(Self {
            entries: RwLock::new(entries),
            source: Some(path.to_path_buf()),
        })
    }

    /// Re-read the export in place, picking up a newer run of the offline job.
    pub fn reload(&self) -> Result<usize> {
        let Some(path) = self.source.as_deref() else {
            return Ok(self.entry_count());
        };
        let entries = read_export(path)?;
        let count = entries.len();
        *self.entries.write() = entries;
        Ok(count)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Embedding width of the loaded export, `None` when empty.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.read().first().map(|e| e.embedding.len())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<VectorMatch> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = entries
            .iter()
            .map(|e| (cosine_similarity(query, &e.embedding), e))
            .collect();

        // Sort descending by score, id for stable ties
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, e)| VectorMatch {
                metadata: e.metadata.clone(),
                score,
            })
            .collect()
    }
}

fn read_export(path: &Path) -> Result<Vec<VectorEntry>> {
    if !path.exists() {
        tracing::warn!("Vector export {} not found, semantic index is empty", path.display());
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vector export {}", path.display()))?;
    serde_json::from_str(&data).context("Failed to parse vector export")
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn top_k(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, SearchError> {
        if vector.is_empty() {
            return Err(VectorProviderError::new(LOCAL_PROVIDER, "query embedding is empty").into());
        }
        // A different width means the embedding model does not match the export.
        if let Some(dim) = self.dimension() {
            if dim != vector.len() {
                return Err(VectorProviderError::new(
                    LOCAL_PROVIDER,
                    format!(
                        "query embedding has {} dimensions, index has {dim}",
                        vector.len()
                    ),
                )
                .into());
            }
        }
        Ok(self.search(vector, k))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

// ─── REST index ──────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: Vec<QueryHit>,
}

#[derive(Deserialize)]
struct QueryHit {
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Client for a hosted vector index exposing `POST {url}/query`.
pub struct HttpVectorIndex {
    client: reqwest::Client,
    url: Option<String>,
    token: Option<String>,
}

impl HttpVectorIndex {
    pub fn new(client: reqwest::Client, url: Option<String>, token: Option<String>) -> Self {
        Self { client, url, token }
    }

    fn provider_error(reason: impl Into<String>) -> SearchError {
        VectorProviderError::new(HTTP_PROVIDER, reason).into()
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn top_k(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, SearchError> {
        let Some(base_url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Err(Self::provider_error("vector index URL is not configured"));
        };
        let url = format!("{}/query", base_url.trim_end_matches('/'));

        let mut req = self.client.post(&url).json(&QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
        });
        if let Some(token) = self.token.as_deref() {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("failed to reach vector index: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::provider_error(format!("vector index returned {status}: {body}")));
        }

        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("failed to parse vector index response: {e}")))?;

        Ok(body
            .result
            .into_iter()
            .map(|hit| VectorMatch {
                metadata: hit.metadata.unwrap_or_default(),
                score: hit.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, embedding: Vec<f32>) -> VectorEntry {
        let metadata = json!({ "id": id, "type": "place", "title": id, "slug": id });
        VectorEntry {
            id: id.to_string(),
            embedding,
            metadata: metadata.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_local_top_k_orders_by_similarity() {
        let index = LocalVectorIndex::from_entries(vec![
            entry("bethel", vec![0.1, 0.9]),
            entry("jericho", vec![0.9, 0.1]),
            entry("zion", vec![0.5, 0.5]),
        ]);

        let matches = index.top_k(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].metadata["id"], "jericho");
        assert_eq!(matches[1].metadata["id"], "zion");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_local_empty_query_is_provider_error() {
        let index = LocalVectorIndex::from_entries(vec![entry("a", vec![1.0])]);
        let err = index.top_k(&[], 5).await.unwrap_err();
        assert!(matches!(err, SearchError::VectorProvider(_)));
    }

    #[tokio::test]
    async fn test_local_dimension_mismatch_is_provider_error() {
        let index = LocalVectorIndex::from_entries(vec![entry("a", vec![1.0, 0.0])]);
        assert_eq!(index.dimension(), Some(2));

        match index.top_k(&[1.0, 0.0, 0.0], 5).await.unwrap_err() {
            SearchError::VectorProvider(e) => {
                assert_eq!(e.provider, "local");
                assert_eq!(e.reason, "query embedding has 3 dimensions, index has 2");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_empty_index_returns_no_matches() {
        let index = LocalVectorIndex::from_entries(Vec::new());
        assert_eq!(index.dimension(), None);
        assert!(index.top_k(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_export_is_empty_and_reload_picks_up_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");

        let index = LocalVectorIndex::open(&path).unwrap();
        assert_eq!(index.entry_count(), 0);

        let export = vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])];
        std::fs::write(&path, serde_json::to_string(&export).unwrap()).unwrap();

        assert_eq!(index.reload().unwrap(), 2);
        assert_eq!(index.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_http_index_without_url_is_provider_error() {
        let index = HttpVectorIndex::new(reqwest::Client::new(), None, None);
        let err = index.top_k(&[1.0], 5).await.unwrap_err();
        match err {
            SearchError::VectorProvider(e) => assert_eq!(e.provider, "http"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_index_unreachable_is_provider_error() {
        let index = HttpVectorIndex::new(
            reqwest::Client::new(),
            Some("http://127.0.0.1:9".to_string()),
            Some("token".to_string()),
        );
        let err = index.top_k(&[1.0], 5).await.unwrap_err();
        assert!(matches!(err, SearchError::VectorProvider(_)));
    }

    #[test]
    fn test_query_request_wire_shape() {
        let body = serde_json::to_value(QueryRequest {
            vector: &[0.5],
            top_k: 20,
            include_metadata: true,
        })
        .unwrap();
        assert_eq!(body, json!({ "vector": [0.5], "topK": 20, "includeMetadata": true }));
    }

    #[test]
    fn test_query_response_tolerates_missing_metadata() {
        let body: QueryResponse =
            serde_json::from_str(r#"{"result": [{"id": "1", "score": 0.8}]}"#).unwrap();
        assert_eq!(body.result.len(), 1);
        assert!(body.result[0].metadata.is_none());
    }
}
