use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::*;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, Term};

use crate::models::{ContentRecord, EntityType};
use crate::search::content::{ContentRepository, RawMatch};

const STATUS_PUBLISHED: &str = "published";
const STATUS_DRAFT: &str = "draft";

const TITLE_BOOST: f32 = 3.0;
const DESCRIPTION_BOOST: f32 = 1.5;

/// BM25 index over every content type, built on tantivy.
pub struct ContentIndex {
    index: Index,
    reader: IndexReader,
    // Field handles
    f_id: Field,
    f_entity_type: Field,
    f_title: Field,
    f_description: Field,
    f_slug: Field,
    f_body: Field,
    f_status: Field,
}

impl ContentIndex {
    /// Create or open a content index at the given directory.
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let mut schema_builder = Schema::builder();
        let f_id = schema_builder.add_text_field("id", STRING | STORED);
        let f_entity_type = schema_builder.add_text_field("entity_type", STRING | STORED);
        let f_title = schema_builder.add_text_field("title", TEXT | STORED);
        let f_description = schema_builder.add_text_field("description", TEXT | STORED);
        let f_slug = schema_builder.add_text_field("slug", STRING | STORED);
        let f_body = schema_builder.add_text_field("body", TEXT);
        let f_status = schema_builder.add_text_field("status", STRING | STORED);
        let schema = schema_builder.build();

        let dir = MmapDirectory::open(index_dir).context("Failed to open index directory")?;
        let index = Index::open_or_create(dir, schema).context("Failed to open tantivy index")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create reader")?;

        Ok(Self {
            index,
            reader,
            f_id,
            f_entity_type,
            f_title,
            f_description,
            f_slug,
            f_body,
            f_status,
        })
    }

    /// Replace the whole index with `records`. Drafts are indexed with a
    /// draft status and filtered out at query time.
    pub fn rebuild(&self, records: &[ContentRecord]) -> Result<usize> {
        let mut writer: IndexWriter = self
            .index
            .writer(50_000_000)
            .context("Failed to create index writer")?;

        writer
            .delete_all_documents()
            .context("Failed to clear index")?;

        for record in records {
            let status = if record.published {
                STATUS_PUBLISHED
            } else {
                STATUS_DRAFT
            };
            writer.add_document(doc!(
                self.f_id => record.id.clone(),
                self.f_entity_type => record.entity_type.as_str().to_string(),
                self.f_title => record.title.clone(),
                self.f_description => record.description.clone(),
                self.f_slug => record.slug.clone(),
                self.f_body => record.body.clone(),
                self.f_status => status.to_string(),
            ))?;
        }

        writer.commit().context("Failed to commit index")?;
        self.reader.reload().context("Failed to reload reader")?;
        Ok(records.len())
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn filter_clause(&self, field: Field, value: &str) -> (Occur, Box<dyn Query>) {
        let term = TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        );
        // Filters must not move the BM25 score.
        (Occur::Must, Box::new(ConstScoreQuery::new(Box::new(term), 0.0)))
    }

    /// Published records of `entity_type` matching `query_str`, best first.
    pub fn search(
        &self,
        entity_type: EntityType,
        query_str: &str,
        limit: usize,
    ) -> Result<Vec<RawMatch>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut query_parser = QueryParser::for_index(
            &self.index,
            vec![self.f_title, self.f_description, self.f_body],
        );
        query_parser.set_field_boost(self.f_title, TITLE_BOOST);
        query_parser.set_field_boost(self.f_description, DESCRIPTION_BOOST);

        // User input is free text; syntax errors just drop the offending clause.
        let (text_query, errors) = query_parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            tracing::debug!("Lenient parse of '{query_str}' dropped {} clause(s)", errors.len());
        }

        let query = BooleanQuery::new(vec![
            (Occur::Must, text_query),
            self.filter_clause(self.f_entity_type, entity_type.as_str()),
            self.filter_clause(self.f_status, STATUS_PUBLISHED),
        ]);

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .context("Search failed")?;

        let mut hits = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;

            let text = |field: Field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };

            if text(self.f_status) != STATUS_PUBLISHED {
                continue;
            }
            let Some(stored_type) = EntityType::parse(&text(self.f_entity_type)) else {
                continue;
            };

            hits.push(RawMatch {
                record: ContentRecord {
                    id: text(self.f_id),
                    entity_type: stored_type,
                    title: text(self.f_title),
                    description: text(self.f_description),
                    slug: text(self.f_slug),
                    body: String::new(),
                    published: true,
                },
                score,
            });
        }

        Ok(hits)
    }
}

/// A per-type view of the shared [`ContentIndex`].
pub struct Bm25Repository {
    index: Arc<ContentIndex>,
    entity_type: EntityType,
}

impl Bm25Repository {
    pub fn new(index: Arc<ContentIndex>, entity_type: EntityType) -> Self {
        Self { index, entity_type }
    }
}

#[async_trait]
impl ContentRepository for Bm25Repository {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    async fn search_published(&self, text: &str, limit: usize) -> Result<Vec<RawMatch>> {
        let index = self.index.clone();
        let entity_type = self.entity_type;
        let text = text.to_string();
        tokio::task::spawn_blocking(move || index.search(entity_type, &text, limit))
            .await
            .context("BM25 search task failed")?
    }
}

/// One BM25 repository per entity type, all backed by `index`.
pub fn bm25_repositories(index: Arc<ContentIndex>) -> Vec<Arc<dyn ContentRepository>> {
    EntityType::ALL
        .into_iter()
        .map(|t| Arc::new(Bm25Repository::new(index.clone(), t)) as Arc<dyn ContentRepository>)
        .collect()
}
