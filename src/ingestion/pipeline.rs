//! Orchestrates fetch → parse → chunk → embed → index for pages.
//!
//! The pipeline is strictly sequential per page, and failure is data wherever
//! a collaborator can answer with a status: a fetch status (success or error)
//! is stored once and never refetched unless explicitly forced, and a failed
//! embedding batch leaves the markdown in place with no chunks. Only
//! transport failures, storage failures, and malformed HTML are errors.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::fetch::PageFetcher;
use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::sections::{self, Section};
use crate::stores::{NewChunk, PageFetchUpdate, SqliteStore};
use crate::types::RagError;

/// Pages buffered between durable commits during bulk scraping. A crash
/// loses at most one batch of fetch results.
const FETCH_COMMIT_BATCH: usize = 100;

/// Result of a bulk scrape pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScrapeSummary {
    pub fetched: usize,
    pub skipped: usize,
}

/// Result of an extraction sweep over fetched-but-unextracted pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub failed: usize,
}

/// Drives pages through the ingestion pipeline.
pub struct Ingestor {
    store: SqliteStore,
    fetcher: PageFetcher,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<RwLock<VectorIndex>>,
    dimension: usize,
}

impl Ingestor {
    pub fn new(
        store: SqliteStore,
        fetcher: PageFetcher,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<RwLock<VectorIndex>>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            embedder,
            index,
            dimension,
        }
    }

    /// Ingests one page and returns its fetch status.
    ///
    /// A stored status is a terminal cache: the page is only fetched when no
    /// status exists or `force_refetch` is set. Extraction runs at most once
    /// per page — a page that already has markdown is left untouched even
    /// when a refetch is forced. Unregistered pages report 404.
    pub async fn ingest(
        &self,
        project: &str,
        name: &str,
        force_refetch: bool,
    ) -> Result<u16, RagError> {
        let Some(mut page) = self.store.find_page(project, name).await? else {
            debug!(project, page = name, "page not registered; nothing to ingest");
            return Ok(404);
        };

        if page.status.is_none() || force_refetch {
            let outcome = self.fetcher.fetch(project, name).await?;
            self.store
                .set_page_fetch(page.id, outcome.status, outcome.html.as_deref())
                .await?;
            page.status = Some(outcome.status);
            page.html = outcome.html;
        }

        if let (Some(html), None) = (page.html.as_deref(), page.markdown.as_deref()) {
            self.extract_page(page.id, html).await?;
        }

        Ok(page.status.unwrap_or(404))
    }

    /// Parses a fetched page, stores its markdown, and embeds one chunk per
    /// section as a single batch. Returns how many chunks were indexed.
    async fn extract_page(&self, page_id: i64, html: &str) -> Result<usize, RagError> {
        let parsed = sections::parse_page(html)?;
        self.store
            .set_page_markdown(page_id, &parsed.markdown)
            .await?;
        if parsed.sections.is_empty() {
            debug!(page_id, "page produced no sections");
            return Ok(0);
        }

        let texts: Vec<String> = parsed.sections.iter().map(Section::chunk_text).collect();
        let reply = self.embedder.embed_batch(&texts).await?;
        let status = reply.status;
        let Some(vectors) = reply.into_vectors() else {
            warn!(
                page_id,
                status, "embedding batch failed; markdown kept, no chunks stored"
            );
            return Ok(0);
        };
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedding count mismatch: {} texts, {} vectors",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(RagError::Dimension {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
        }

        let chunks: Vec<NewChunk> = texts
            .iter()
            .zip(&vectors)
            .map(|(text, vector)| NewChunk {
                text: text.clone(),
                status,
                vector: Some(vector.clone()),
            })
            .collect();
        let ids = self.store.insert_chunks(page_id, chunks).await?;
        self.index.write().add(&ids, &vectors)?;
        info!(page_id, chunks = ids.len(), "extracted and indexed page");
        Ok(ids.len())
    }

    /// Fetches the `limit` most popular pages that have no fetch status yet,
    /// committing results every [`FETCH_COMMIT_BATCH`] pages.
    pub async fn scrape_top_pages(&self, limit: u32) -> Result<ScrapeSummary, RagError> {
        let candidates = self.store.top_pages(limit).await?;
        let mut summary = ScrapeSummary::default();
        let mut batch: Vec<PageFetchUpdate> = Vec::new();
        for candidate in candidates {
            if candidate.status.is_some() {
                summary.skipped += 1;
                continue;
            }
            let outcome = self
                .fetcher
                .fetch(&candidate.project_name, &candidate.page_name)
                .await?;
            batch.push(PageFetchUpdate {
                page_id: candidate.id,
                status: outcome.status,
                html: outcome.html,
            });
            summary.fetched += 1;
            if batch.len() >= FETCH_COMMIT_BATCH {
                self.store.apply_fetch_batch(std::mem::take(&mut batch)).await?;
            }
        }
        self.store.apply_fetch_batch(batch).await?;
        info!(
            fetched = summary.fetched,
            skipped = summary.skipped,
            "bulk scrape finished"
        );
        Ok(summary)
    }

    /// Extracts every fetched page that has no markdown yet. A page whose
    /// HTML fails to parse is skipped without touching the others.
    pub async fn extract_pending(&self) -> Result<ExtractSummary, RagError> {
        let pending = self.store.pages_pending_extraction().await?;
        let mut summary = ExtractSummary::default();
        for page in pending {
            debug!(page = %page.name, "extracting sections");
            match self.extract_page(page.id, &page.html).await {
                Ok(_) => summary.extracted += 1,
                Err(RagError::Parse(reason)) => {
                    warn!(page = %page.name, %reason, "skipping page with malformed html");
                    summary.failed += 1;
                }
                Err(other) => return Err(other),
            }
        }
        Ok(summary)
    }
}
