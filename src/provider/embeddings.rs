use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{SearchError, VectorProviderError};

/// Maximum characters sent to the embedding API for a single query.
/// Search queries are short; anything longer is almost certainly pasted
/// text and gains nothing from the tail.
const MAX_EMBED_CHARS: usize = 2_000;

/// Turns query text into an embedding vector.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    /// Exactly one upstream call per invocation. Credential and upstream
    /// failures are reported as [`SearchError::VectorProvider`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError>;
}

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Embedding client for OpenAI-compatible and Ollama APIs.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: EmbeddingConfig) -> Self {
        Self { client, config }
    }

    fn provider_error(&self, reason: impl Into<String>) -> SearchError {
        VectorProviderError::new(self.config.provider.clone(), reason).into()
    }
}

#[async_trait]
impl QueryEmbedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let text = truncate_for_embedding(text);
        match self.config.provider.as_str() {
            "openai" => self.embed_openai(text).await,
            "ollama" => self.embed_ollama(text).await,
            other => Err(self.provider_error(format!("unknown embedding provider '{other}'"))),
        }
    }
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    async fn embed_openai(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(self.provider_error("embedding API key is not configured"));
        };
        let url = format!("{}/v1/embeddings", self.config.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&OpenAiEmbedRequest {
                model: &self.config.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| self.provider_error(format!("failed to call embedding API: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.provider_error(format!("embedding API returned {status}: {body}")));
        }

        let body: OpenAiEmbedResponse = resp
            .json()
            .await
            .map_err(|e| self.provider_error(format!("failed to parse embedding response: {e}")))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| self.provider_error("embedding API returned no vectors"))
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbedder {
    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let url = format!("{}/api/embed", self.config.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .json(&OllamaEmbedRequest {
                model: &self.config.model,
                input: text,
                truncate: true,
            })
            .send()
            .await
            .map_err(|e| self.provider_error(format!("failed to call Ollama embed API: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.provider_error(format!("Ollama embed API returned {status}: {body}")));
        }

        let body: OllamaEmbedResponse = resp
            .json()
            .await
            .map_err(|e| self.provider_error(format!("failed to parse Ollama embed response: {e}")))?;

        body.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| self.provider_error("Ollama embed API returned no vectors"))
    }
}
