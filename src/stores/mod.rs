//! Durable storage for projects, pages, and chunks.
//!
//! Three relational entities back the pipeline:
//!
//! ```text
//! projects ──< pages ──< chunks
//!                │          │
//!            pages_fts  chunks_fts      (external-content FTS5, trigger-synced)
//! ```
//!
//! Pages carry their fetch status as a terminal cache together with the
//! zlib-compressed HTML payload and the derived markdown. Chunks carry the
//! embeddable text, the embedding status, and the vector as a fixed-width
//! little-endian `f32` BLOB. The vector index is *not* stored here — it is
//! derived, rebuilt from [`SqliteStore::embedded_chunks`] at startup.

pub mod sqlite;

use serde::Serialize;

pub use sqlite::SqliteStore;

/// A page row as the ingestion pipeline sees it. HTML is decompressed.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub status: Option<u16>,
    pub html: Option<String>,
    pub markdown: Option<String>,
}

/// Page metadata returned by document search; serialized as-is for the
/// consumer-facing tool layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHit {
    pub page_id: i64,
    pub project_name: String,
    pub page_name: String,
    pub views: i64,
    pub status: Option<u16>,
}

/// A page eligible for bulk scraping, ordered by popularity.
#[derive(Debug, Clone)]
pub struct FetchCandidate {
    pub id: i64,
    pub project_name: String,
    pub page_name: String,
    pub status: Option<u16>,
}

/// A fetched page whose sections have not been extracted yet.
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub id: i64,
    pub name: String,
    pub html: String,
}

/// A chunk ready for insertion.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub text: String,
    pub status: u16,
    pub vector: Option<Vec<f32>>,
}

/// A chunk matched by lexical search, in relevance order.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub id: i64,
    pub text: String,
}

/// One page's fetch result, buffered for a batched durable commit.
#[derive(Debug, Clone)]
pub struct PageFetchUpdate {
    pub page_id: i64,
    pub status: u16,
    pub html: Option<String>,
}
