//! # bible-search
//!
//! Search service for the Bible content site. It answers keyword queries
//! from a lexical index of published content and semantic queries from a
//! vector index of the same content. When the semantic path is unavailable
//! it falls back to keyword search.
//!
//! ## Request flow
//!
//! ```text
//!                    GET /search?q&mode&limit&types
//!                                 │
//!                                 ▼
//!                    ┌─────────────────────────┐
//!                    │   SearchOrchestrator    │
//!                    │ validate, clamp, filter │
//!                    └────────────┬────────────┘
//!                 keyword         │          semantic
//!            ┌────────────────────┴────────────────────┐
//!            ▼                                         ▼
//!  ┌───────────────────┐                   ┌───────────────────────┐
//!  │ KeywordSearch     │                   │ SemanticSearch        │
//!  │ one repository    │                   │ embed (cached)        │
//!  │ per entity type,  │◀── fallback on ───│ topK(limit × 2)       │
//!  │ scores to 0-100   │  provider error   │ decode, type filter   │
//!  └─────────┬─────────┘                   └───────────┬───────────┘
//!            └────────────────────┬────────────────────┘
//!                                 ▼
//!                    ┌─────────────────────────┐
//!                    │  group by entity type   │
//!                    └─────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data files, providers and tuning
//! - [`error`] - `SearchError` taxonomy and the recoverable `VectorProviderError`
//! - [`models`] - Entity types, queries, results and the response envelope
//! - [`provider`] - Vector provider resolution, query embedding and the embedding cache
//! - [`search::content`] - Content export loader and the substring repository
//! - [`search::bm25`] - Published-content BM25 index powered by tantivy
//! - [`search::keyword`] - Per-type fan-out, score rescaling and ranking
//! - [`search::vector`] - Local cosine index and REST vector index client
//! - [`search::semantic`] - Embedding + nearest-neighbour search with metadata decoding
//! - [`search::orchestrator`] - Mode dispatch and keyword fallback
//! - [`api`] - Axum HTTP handlers for search and health
//! - [`state`] - Shared application state built once at start-up

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod search;
pub mod state;
