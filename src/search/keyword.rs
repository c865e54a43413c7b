use anyhow::Context;
use futures_util::future::try_join_all;
use std::sync::Arc;

use crate::error::SearchError;
use crate::models::{type_allowed, SearchResult, TypeFilter};
use crate::search::content::{ContentRepository, RawMatch};

/// Lexical search across every content repository.
///
/// Per-type queries run concurrently. Each repository's raw scores are
/// rescaled onto 0-100 relative to that repository's best hit, so a type
/// whose scorer produces larger numbers cannot crowd out the others.
pub struct KeywordSearchEngine {
    repositories: Vec<Arc<dyn ContentRepository>>,
}

impl KeywordSearchEngine {
    pub fn new(repositories: Vec<Arc<dyn ContentRepository>>) -> Self {
        Self { repositories }
    }

    pub async fn search(
        &self,
        text: &str,
        limit: usize,
        types: &TypeFilter,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let searches = self
            .repositories
            .iter()
            .filter(|repo| type_allowed(types, repo.entity_type()))
            .map(|repo| async move {
                repo.search_published(text, limit)
                    .await
                    .with_context(|| format!("Keyword search failed for {}", repo.entity_type()))
                    .map(|matches| {
                        // Guard the draft invariant even against a misbehaving repository.
                        let expected = repo.entity_type();
                        matches
                            .into_iter()
                            .filter(|m| m.record.published && m.record.entity_type == expected)
                            .collect::<Vec<_>>()
                    })
            });

        let per_type = try_join_all(searches).await?;

        let mut results: Vec<SearchResult> = per_type.into_iter().flat_map(rescale).collect();
        sort_results(&mut results);
        results.truncate(limit);

        tracing::debug!("Keyword search for '{text}' returned {} results", results.len());
        Ok(results)
    }
}

/// Map one repository's raw scores onto the unified 0-100 scale. The best
/// hit maps to 100; non-finite or negative scores map to 0.
pub fn rescale(matches: Vec<RawMatch>) -> Vec<SearchResult> {
    let max = matches
        .iter()
        .map(|m| m.score)
        .filter(|s| s.is_finite())
        .fold(0.0f32, f32::max);

    matches
        .into_iter()
        .map(|m| {
            let score = if max > 0.0 && m.score.is_finite() {
                (m.score.max(0.0) / max * 100.0).round().clamp(0.0, 100.0) as u8
            } else {
                0
            };
            m.record.to_result(score)
        })
        .collect()
}

/// Score descending, then title ascending. Type and id break any remaining
/// ties so the order is fully deterministic.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.entity_type.cmp(&b.entity_type))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_type_filter, ContentRecord, EntityType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRepository {
        entity_type: EntityType,
        matches: Vec<RawMatch>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeRepository {
        fn new(entity_type: EntityType, hits: &[(&str, f32)]) -> Self {
            let matches = hits
                .iter()
                .enumerate()
                .map(|(i, (title, score))| RawMatch {
                    record: ContentRecord {
                        id: format!("{entity_type}-{i}"),
                        entity_type,
                        title: title.to_string(),
                        description: String::new(),
                        slug: title.to_lowercase(),
                        body: String::new(),
                        published: true,
                    },
                    score: *score,
                })
                .collect();
            Self {
                entity_type,
                matches,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ContentRepository for FakeRepository {
        fn entity_type(&self) -> EntityType {
            self.entity_type
        }

        async fn search_published(&self, _text: &str, limit: usize) -> anyhow::Result<Vec<RawMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("database unavailable");
            }
            Ok(self.matches.iter().take(limit).cloned().collect())
        }
    }

    fn engine(repos: Vec<Arc<FakeRepository>>) -> KeywordSearchEngine {
        KeywordSearchEngine::new(
            repos
                .into_iter()
                .map(|r| r as Arc<dyn ContentRepository>)
                .collect(),
        )
    }

    #[test]
    fn test_rescale_maps_best_hit_to_100() {
        let repo = FakeRepository::new(EntityType::Place, &[("A", 12.0), ("B", 6.0), ("C", 0.0)]);
        let scores: Vec<u8> = rescale(repo.matches).iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![100, 50, 0]);
    }

    #[test]
    fn test_rescale_handles_degenerate_scores() {
        let repo = FakeRepository::new(EntityType::Place, &[("A", f32::NAN), ("B", -3.0)]);
        let scores: Vec<u8> = rescale(repo.matches).iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_different_raw_ranges_are_comparable() {
        // BM25-like scores in the tens vs substring-like scores below 1.
        let places = Arc::new(FakeRepository::new(EntityType::Place, &[("Jericho", 40.0), ("Bethel", 10.0)]));
        let names = Arc::new(FakeRepository::new(EntityType::Name, &[("Abel", 0.9), ("Cain", 0.45)]));

        let results = engine(vec![places, names]).search("x", 10, &None).await.unwrap();

        let top: Vec<(&str, u8)> = results.iter().take(2).map(|r| (r.title.as_str(), r.score)).collect();
        assert_eq!(top, vec![("Abel", 100), ("Jericho", 100)]);
        assert!(results.iter().all(|r| r.score <= 100));
    }

    #[tokio::test]
    async fn test_truncates_after_merge() {
        let places = Arc::new(FakeRepository::new(
            EntityType::Place,
            &[("P1", 10.0), ("P2", 9.0), ("P3", 8.0), ("P4", 7.0)],
        ));
        let verses = Arc::new(FakeRepository::new(EntityType::Verse, &[("V1", 5.0)]));

        let results = engine(vec![places, verses]).search("x", 2, &None).await.unwrap();

        assert_eq!(results.len(), 2);
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["P1", "V1"]);
    }

    #[tokio::test]
    async fn test_only_filtered_types_are_queried() {
        let places = Arc::new(FakeRepository::new(EntityType::Place, &[("Jericho", 1.0)]));
        let verses = Arc::new(FakeRepository::new(EntityType::Verse, &[("John 1:1", 1.0)]));

        let filter = parse_type_filter(&["place"]);
        let results = engine(vec![places.clone(), verses.clone()])
            .search("x", 10, &filter)
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.entity_type == EntityType::Place));
        assert_eq!(places.calls.load(Ordering::SeqCst), 1);
        assert_eq!(verses.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drafts_from_repository_are_dropped() {
        let mut repo = FakeRepository::new(EntityType::Name, &[("Draft", 5.0), ("Live", 1.0)]);
        repo.matches[0].record.published = false;

        let results = engine(vec![Arc::new(repo)]).search("x", 10, &None).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Live");
    }

    #[tokio::test]
    async fn test_repository_failure_is_unexpected() {
        let mut repo = FakeRepository::new(EntityType::Name, &[("Abel", 1.0)]);
        repo.fail = true;

        let err = engine(vec![Arc::new(repo)]).search("x", 10, &None).await.unwrap_err();
        assert!(matches!(err, SearchError::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_equal_scores_order_by_title() {
        let places = Arc::new(FakeRepository::new(EntityType::Place, &[("Zion", 1.0)]));
        let names = Arc::new(FakeRepository::new(EntityType::Name, &[("Aaron", 1.0)]));
        let verses = Arc::new(FakeRepository::new(EntityType::Verse, &[("Mark 1:1", 1.0)]));
        let engine = engine(vec![places, names, verses]);

        let first = engine.search("x", 10, &None).await.unwrap();
        let second = engine.search("x", 10, &None).await.unwrap();

        let titles: Vec<&str> = first.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Aaron", "Mark 1:1", "Zion"]);
        assert_eq!(first, second);
    }
}
