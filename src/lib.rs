//! Wikipedia ingestion and retrieval engine.
//!
//! ```text
//! ingestion::fetch ──► raw HTML ──► sections::SectionParser ──► markdown + sections
//!                                                  │
//!                               chunk texts ──► embeddings::EmbeddingProvider
//!                                                  │
//!                        stores::SqliteStore ◄─────┴────► index::VectorIndex
//!                                 │                            │
//!            retrieval::RetrievalService ◄────────────────────┘
//!                                 │
//!                        kb::KnowledgeBase  (consumer-facing operations)
//! ```
//!
//! Pages are registered per project, fetched once (the HTTP status is a
//! terminal cache), parsed into markdown plus heading-scoped sections,
//! embedded in one batch per page, and indexed for semantic search. Lexical
//! search runs against FTS5 tables maintained alongside the stores. The
//! [`kb::KnowledgeBase`] facade is the only surface external callers use.

pub mod config;
pub mod embeddings;
pub mod index;
pub mod ingestion;
pub mod kb;
pub mod retrieval;
pub mod sections;
pub mod stores;
pub mod types;

pub use config::RagConfig;
pub use embeddings::{EmbeddingProvider, EmbeddingReply, MockEmbeddings, OllamaEmbeddings};
pub use index::VectorIndex;
pub use ingestion::{
    ExtractSummary, FetchOutcome, Ingestor, PageFetcher, PageviewTotals, ScrapeSummary,
    parse_pageviews,
};
pub use kb::KnowledgeBase;
pub use retrieval::{RetrievalService, SimilarityGate, sanitize_term};
pub use sections::{ParsedPage, Section, SectionParser, parse_page};
pub use stores::{PageHit, PageRecord, SqliteStore};
pub use types::RagError;
