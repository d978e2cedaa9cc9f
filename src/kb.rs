//! The consumer-facing knowledge base facade.
//!
//! [`KnowledgeBase`] wires the store, the derived vector index, the fetcher,
//! and the embedding provider together once at startup and exposes a fixed,
//! typed interface. Callers (the chat/tool layer, CLIs) go through these
//! methods only — they never touch the stores or the index directly.
//!
//! Concurrency: retrieval reads share the index lock, index extension takes
//! it exclusively, and SQLite access is serialized by the connection handle.
//! Ingestion is sequential per page by construction.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use tracing::info;

use crate::config::RagConfig;
use crate::embeddings::{EmbeddingProvider, OllamaEmbeddings};
use crate::index::VectorIndex;
use crate::ingestion::fetch::PageFetcher;
use crate::ingestion::pageviews::{self, PageviewTotals};
use crate::ingestion::pipeline::{ExtractSummary, Ingestor, ScrapeSummary};
use crate::retrieval::RetrievalService;
use crate::stores::{PageHit, SqliteStore};
use crate::types::RagError;

pub struct KnowledgeBase {
    config: RagConfig,
    store: SqliteStore,
    index: Arc<RwLock<VectorIndex>>,
    ingestor: Ingestor,
    retrieval: RetrievalService,
}

impl KnowledgeBase {
    /// Opens the store at the configured path and wires the production
    /// collaborators (Ollama embeddings, live page fetcher).
    pub async fn open(config: RagConfig) -> Result<Self, RagError> {
        let store = SqliteStore::open(&config.db_path).await?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbeddings::new(
            client,
            config.ollama_url.clone(),
            config.embed_model.clone(),
        ));
        let mut fetcher = PageFetcher::new(&config.user_agent)?;
        if let Some(base) = &config.wiki_base_url {
            fetcher = fetcher.with_base_url(base.clone());
        }
        Self::assemble(config, store, embedder, fetcher).await
    }

    /// Wires a knowledge base from explicit parts. The vector index is
    /// rebuilt here from every successfully embedded chunk in the store.
    pub async fn assemble(
        config: RagConfig,
        store: SqliteStore,
        embedder: Arc<dyn EmbeddingProvider>,
        fetcher: PageFetcher,
    ) -> Result<Self, RagError> {
        let mut index = VectorIndex::new(config.dimension);
        let stored = store.embedded_chunks(None).await?;
        if !stored.is_empty() {
            let (ids, vectors): (Vec<i64>, Vec<Vec<f32>>) = stored.into_iter().unzip();
            index.add(&ids, &vectors)?;
        }
        info!(chunks = index.len(), "vector index rebuilt");
        let index = Arc::new(RwLock::new(index));

        let ingestor = Ingestor::new(
            store.clone(),
            fetcher,
            Arc::clone(&embedder),
            Arc::clone(&index),
            config.dimension,
        );
        let retrieval = RetrievalService::new(
            store.clone(),
            embedder,
            Arc::clone(&index),
            config.gate,
            config.oversample,
            config.min_views,
        );
        Ok(Self {
            config,
            store,
            index,
            ingestor,
            retrieval,
        })
    }

    /// Ingests a page, returning its fetch status. A previously stored
    /// status — success or failure — is returned without refetching.
    pub async fn ingest(&self, project: &str, page: &str) -> Result<u16, RagError> {
        self.ingestor.ingest(project, page, false).await
    }

    /// Like [`ingest`](Self::ingest) but refetches even when a status is
    /// already stored. Extraction still runs at most once per page.
    pub async fn ingest_with_refetch(&self, project: &str, page: &str) -> Result<u16, RagError> {
        self.ingestor.ingest(project, page, true).await
    }

    /// Semantic retrieval: unique chunk texts most similar to `text`.
    pub async fn semantic_query(&self, text: &str) -> Result<Vec<String>, RagError> {
        self.retrieval
            .semantic_query(text, self.config.default_k)
            .await
    }

    pub async fn semantic_query_k(&self, text: &str, k: usize) -> Result<Vec<String>, RagError> {
        self.retrieval.semantic_query(text, k).await
    }

    /// Lexical retrieval over chunk text.
    pub async fn lexical_query(&self, term: &str) -> Result<Vec<String>, RagError> {
        self.retrieval
            .lexical_query(term, self.config.default_k)
            .await
    }

    pub async fn lexical_query_k(&self, term: &str, k: usize) -> Result<Vec<String>, RagError> {
        self.retrieval.lexical_query(term, k).await
    }

    /// Searches page metadata by title.
    pub async fn search_documents(&self, term: &str) -> Result<Vec<PageHit>, RagError> {
        self.retrieval
            .search_documents(term, self.config.default_k)
            .await
    }

    pub async fn search_documents_k(
        &self,
        term: &str,
        k: usize,
    ) -> Result<Vec<PageHit>, RagError> {
        self.retrieval.search_documents(term, k).await
    }

    /// Fetches the most popular unfetched pages in durable batches.
    pub async fn scrape_top_pages(&self, limit: u32) -> Result<ScrapeSummary, RagError> {
        self.ingestor.scrape_top_pages(limit).await
    }

    /// Extracts and embeds every fetched page that has no markdown yet.
    pub async fn extract_pending(&self) -> Result<ExtractSummary, RagError> {
        self.ingestor.extract_pending().await
    }

    /// Loads aggregated pageview totals into the store.
    pub async fn load_pageviews(&self, totals: PageviewTotals) -> Result<usize, RagError> {
        pageviews::load_pageviews(&self.store, totals).await
    }

    /// Direct store access for registration and maintenance tasks.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Number of vectors currently in the index.
    pub fn index_len(&self) -> usize {
        self.index.read().len()
    }
}
