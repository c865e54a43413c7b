//! Content repositories: the read interface the keyword engine queries,
//! one repository per entity type.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::models::{ContentRecord, EntityType};

/// A lexical match with its repository-local raw score. Raw scores are only
/// comparable within one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub record: ContentRecord,
    pub score: f32,
}

/// Published-only lexical matching over one entity type.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    fn entity_type(&self) -> EntityType;

    /// Return at most `limit` publish-eligible records matching `text`,
    /// best first. Drafts must never be returned.
    async fn search_published(&self, text: &str, limit: usize) -> Result<Vec<RawMatch>>;
}

/// Load the CMS content export. A missing file yields an empty corpus;
/// a malformed file is an error. Records without an id, title or slug are
/// skipped.
pub fn load_content(path: &Path) -> Result<Vec<ContentRecord>> {
    if !path.exists() {
        tracing::warn!("Content export {} not found, starting empty", path.display());
        return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read content export {}", path.display()))?;
    let records: Vec<ContentRecord> =
        serde_json::from_str(&data).context("Failed to parse content export")?;

    let total = records.len();
    let records: Vec<ContentRecord> = records
        .into_iter()
        .filter(|r| {
            !r.id.trim().is_empty() && !r.title.trim().is_empty() && !r.slug.trim().is_empty()
        })
        .collect();
    if records.len() < total {
        tracing::warn!(
            "Skipped {} content records missing id, title or slug",
            total - records.len()
        );
    }

    Ok(records)
}

// ─── Substring repository ────────────────────────────────

const TITLE_WEIGHT: f32 = 3.0;
const EXACT_TITLE_BONUS: f32 = 2.0;
const DESCRIPTION_WEIGHT: f32 = 2.0;
const BODY_WEIGHT: f32 = 1.0;

/// Case-insensitive substring matching over an in-memory snapshot of
/// published records of one type.
pub struct SubstringRepository {
    entity_type: EntityType,
    records: Vec<ContentRecord>,
}

impl SubstringRepository {
    pub fn new(entity_type: EntityType, records: &[ContentRecord]) -> Self {
        let records = records
            .iter()
            .filter(|r| r.entity_type == entity_type && r.published)
            .cloned()
            .collect();
        Self {
            entity_type,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Field-weighted containment score; zero means no match.
fn substring_score(record: &ContentRecord, needle: &str) -> f32 {
    let title = record.title.to_lowercase();
    let mut score = 0.0;
    if title.contains(needle) {
        score += TITLE_WEIGHT;
        if title == needle {
            score += EXACT_TITLE_BONUS;
        }
    }
    if record.description.to_lowercase().contains(needle) {
        score += DESCRIPTION_WEIGHT;
    }
    if record.body.to_lowercase().contains(needle) {
        score += BODY_WEIGHT;
    }
    score
}

#[async_trait]
impl ContentRepository for SubstringRepository {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    async fn search_published(&self, text: &str, limit: usize) -> Result<Vec<RawMatch>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<RawMatch> = self
            .records
            .iter()
            .filter(|r| r.published)
            .filter_map(|r| {
                let score = substring_score(r, &needle);
                (score > 0.0).then(|| RawMatch {
                    record: r.clone(),
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.title.cmp(&b.record.title))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

/// One substring repository per entity type.
pub fn substring_repositories(records: &[ContentRecord]) -> Vec<Arc<dyn ContentRepository>> {
    EntityType::ALL
        .into_iter()
        .map(|t| Arc::new(SubstringRepository::new(t, records)) as Arc<dyn ContentRepository>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, entity_type: EntityType, title: &str, body: &str, published: bool) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            entity_type,
            title: title.to_string(),
            description: String::new(),
            slug: title.to_lowercase().replace(' ', "-"),
            body: body.to_string(),
            published,
        }
    }

    #[tokio::test]
    async fn test_substring_match_is_case_insensitive() {
        let records = vec![record("1", EntityType::Place, "Bethel", "House of God", true)];
        let repo = SubstringRepository::new(EntityType::Place, &records);

        let hits = repo.search_published("HOUSE of", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, BODY_WEIGHT);
    }

    #[tokio::test]
    async fn test_drafts_are_never_returned() {
        let records = vec![
            record("1", EntityType::Name, "Faith", "", true),
            record("2", EntityType::Name, "Faithful", "", false),
        ];
        let repo = SubstringRepository::new(EntityType::Name, &records);

        let hits = repo.search_published("faith", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "1");
    }

    #[tokio::test]
    async fn test_repository_only_holds_its_type() {
        let records = vec![
            record("1", EntityType::Name, "Faith", "", true),
            record("2", EntityType::Verse, "Faith comes by hearing", "", true),
        ];
        let repo = SubstringRepository::new(EntityType::Verse, &records);
        assert_eq!(repo.len(), 1);

        let hits = repo.search_published("faith", 10).await.unwrap();
        assert!(hits.iter().all(|h| h.record.entity_type == EntityType::Verse));
    }

    #[tokio::test]
    async fn test_title_matches_outrank_body_matches() {
        let records = vec![
            record("1", EntityType::Situation, "Grief", "hold on to hope", true),
            record("2", EntityType::Situation, "Hope", "", true),
            record("3", EntityType::Situation, "Hope in trials", "", true),
        ];
        let repo = SubstringRepository::new(EntityType::Situation, &records);

        let hits = repo.search_published("hope", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "2"); // exact title
        assert_eq!(hits[1].record.id, "3");
    }

    #[tokio::test]
    async fn test_blank_query_matches_nothing() {
        let records = vec![record("1", EntityType::Place, "Bethel", "", true)];
        let repo = SubstringRepository::new(EntityType::Place, &records);
        assert!(repo.search_published("   ", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_load_content_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = load_content(&dir.path().join("content.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_load_content_skips_incomplete_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "1", "type": "place", "title": "Bethel", "slug": "bethel", "published": true},
                {"id": "2", "type": "place", "title": "", "slug": "nowhere", "published": true}
            ]"#,
        )
        .unwrap();

        let records = load_content(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "");
    }

    #[test]
    fn test_load_content_rejects_malformed_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_content(&path).is_err());
    }
}
