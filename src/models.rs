use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::SearchError;

/// Hard upper bound for `limit`.
pub const MAX_LIMIT: usize = 100;

/// The content categories that can be searched, filtered and grouped.
///
/// Variant order is the order groups appear in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Situation,
    PrayerPoint,
    Place,
    Profession,
    Verse,
    Name,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Situation,
        EntityType::PrayerPoint,
        EntityType::Place,
        EntityType::Profession,
        EntityType::Verse,
        EntityType::Name,
    ];

    /// Wire token, e.g. `prayerPoint`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Situation => "situation",
            EntityType::PrayerPoint => "prayerPoint",
            EntityType::Place => "place",
            EntityType::Profession => "profession",
            EntityType::Verse => "verse",
            EntityType::Name => "name",
        }
    }

    /// Parse a wire token. Matching ignores case and surrounding whitespace;
    /// anything else is rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }

    /// First path segment of the public page for this type.
    pub fn path_segment(self) -> &'static str {
        match self {
            EntityType::Situation => "situations",
            EntityType::PrayerPoint => "prayer-points",
            EntityType::Place => "places",
            EntityType::Profession => "professions",
            EntityType::Verse => "verses",
            EntityType::Name => "names",
        }
    }

    /// Canonical page URL for a record of this type.
    pub fn url_for(self, slug: &str) -> String {
        format!("/{}/{slug}", self.path_segment())
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective type filter. `None` means every type.
pub type TypeFilter = Option<BTreeSet<EntityType>>;

/// Parse raw type tokens into an effective filter. Unknown tokens are
/// dropped; if nothing survives the filter is unset rather than empty.
pub fn parse_type_filter<S: AsRef<str>>(tokens: &[S]) -> TypeFilter {
    let types: BTreeSet<EntityType> = tokens
        .iter()
        .filter_map(|t| EntityType::parse(t.as_ref()))
        .collect();
    if types.is_empty() {
        None
    } else {
        Some(types)
    }
}

/// Whether `entity_type` passes `filter`.
pub fn type_allowed(filter: &TypeFilter, entity_type: EntityType) -> bool {
    filter.as_ref().map_or(true, |types| types.contains(&entity_type))
}

/// Read a raw `limit` value. Integers that overflow `i64` saturate and
/// finite decimals are truncated, so out-of-range input is clamped later
/// instead of being mistaken for a missing value. Non-numeric input is `None`.
pub fn parse_limit(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    })
}

/// Clamp a requested limit into `[1, MAX_LIMIT]`.
pub fn clamp_limit(raw: i64) -> usize {
    raw.clamp(1, MAX_LIMIT as i64) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Keyword,
    Semantic,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Keyword => "keyword",
            SearchMode::Semantic => "semantic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keyword" => Some(SearchMode::Keyword),
            "semantic" => Some(SearchMode::Semantic),
            _ => None,
        }
    }
}

/// A single ranked hit. `score` is always on the unified 0-100 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub url: String,
    pub score: u8,
}

/// A semantic hit with the raw similarity kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticSearchResult {
    #[serde(flatten)]
    pub result: SearchResult,
    pub semantic_score: f32,
}

impl From<SemanticSearchResult> for SearchResult {
    fn from(hit: SemanticSearchResult) -> Self {
        hit.result
    }
}

/// A nearest-neighbour candidate as returned by a vector index. The
/// metadata is untyped and must be decoded before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub score: f32,
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub mode: SearchMode,
    pub limit: usize,
    pub types: TypeFilter,
}

impl SearchQuery {
    /// Validate raw request values. Blank text is rejected; the limit is
    /// clamped and unknown type tokens are dropped.
    pub fn parse<S: AsRef<str>>(
        text: &str,
        mode: SearchMode,
        limit: i64,
        types: Option<&[S]>,
    ) -> Result<Self, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SearchError::MissingQuery);
        }
        Ok(Self {
            text: text.to_string(),
            mode,
            limit: clamp_limit(limit),
            types: types.and_then(parse_type_filter),
        })
    }
}

/// Search response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    /// The mode actually used, which differs from the requested one after a fallback.
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
    pub grouped: BTreeMap<EntityType, Vec<SearchResult>>,
}

/// A content record as exported from the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    /// Additional searchable text (meaning, verse text, prayer body...).
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

impl ContentRecord {
    pub fn to_result(&self, score: u8) -> SearchResult {
        SearchResult {
            id: self.id.clone(),
            entity_type: self.entity_type,
            title: self.title.clone(),
            description: self.description.clone(),
            slug: self.slug.clone(),
            url: self.entity_type.url_for(&self.slug),
            score,
        }
    }
}
