//! SQLite-backed store for projects, pages, and chunks.
//!
//! All access goes through a single [`tokio_rusqlite::Connection`]; the
//! handle is cheap to clone and serializes statements on its worker thread.
//! Bulk writes (pageviews loads, scrape batches, chunk inserts) run inside
//! one transaction per call so a crash loses at most one batch.

use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tokio_rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use super::{
    ChunkHit, FetchCandidate, NewChunk, PageFetchUpdate, PageHit, PageRecord, PendingPage,
};
use crate::types::RagError;

/// Embedding status recorded for chunks whose batch embedded successfully.
const EMBED_OK: i64 = 200;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    name TEXT NOT NULL,
    views INTEGER NOT NULL DEFAULT 0,
    status INTEGER,
    html BLOB,
    markdown TEXT,
    UNIQUE (project_id, name)
);
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    text TEXT NOT NULL,
    status INTEGER NOT NULL,
    embedding BLOB
);
CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
    name,
    content='pages',
    content_rowid='id',
    tokenize='unicode61'
);
CREATE TRIGGER IF NOT EXISTS pages_fts_insert AFTER INSERT ON pages BEGIN
    INSERT INTO pages_fts(rowid, name) VALUES (new.id, new.name);
END;
CREATE TRIGGER IF NOT EXISTS pages_fts_delete AFTER DELETE ON pages BEGIN
    INSERT INTO pages_fts(pages_fts, rowid, name) VALUES ('delete', old.id, old.name);
END;
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    text,
    content='chunks',
    content_rowid='id',
    tokenize='unicode61'
);
CREATE TRIGGER IF NOT EXISTS chunks_fts_insert AFTER INSERT ON chunks BEGIN
    INSERT INTO chunks_fts(rowid, text) VALUES (new.id, new.text);
END;
CREATE TRIGGER IF NOT EXISTS chunks_fts_delete AFTER DELETE ON chunks BEGIN
    INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES ('delete', old.id, old.text);
END;
";

/// Handle to the SQLite knowledge store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the store at `path` and applies the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let conn = Connection::open(path).await.map_err(storage_error)?;
        Self::init(conn).await
    }

    /// In-memory store, used by tests.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        let conn = Connection::open_in_memory().await.map_err(storage_error)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, RagError> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)
                .map_err(tokio_rusqlite::Error::Rusqlite)
        })
        .await
        .map_err(storage_error)?;
        debug!("sqlite schema ready");
        Ok(Self { conn })
    }

    /// Registers projects by name; existing rows are left untouched.
    pub async fn register_projects(&self, names: Vec<String>) -> Result<(), RagError> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare("INSERT OR IGNORE INTO projects (name) VALUES (?1)")
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for name in &names {
                        stmt.execute([name]).map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(storage_error)
    }

    /// Registers pages (and their project) with view counts, insert-if-absent.
    /// One call is one transaction; callers batch accordingly.
    pub async fn store_pages(
        &self,
        project: &str,
        pages: Vec<(String, i64)>,
    ) -> Result<(), RagError> {
        let project = project.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                tx.execute("INSERT OR IGNORE INTO projects (name) VALUES (?1)", [&project])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT OR IGNORE INTO pages (project_id, name, views) \
                             SELECT id, ?2, ?3 FROM projects WHERE name = ?1",
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for (name, views) in &pages {
                        stmt.execute((&project, name, views))
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(storage_error)
    }

    /// Registers a single page with zero views. A no-op when it exists.
    pub async fn register_page(&self, project: &str, name: &str) -> Result<(), RagError> {
        self.store_pages(project, vec![(name.to_string(), 0)]).await
    }

    /// Looks up a page by project and name, decompressing any stored HTML.
    pub async fn find_page(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Option<PageRecord>, RagError> {
        let project = project.to_string();
        let name = name.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT pages.id, pages.status, pages.html, pages.markdown \
                         FROM pages \
                         INNER JOIN projects ON pages.project_id = projects.id \
                         WHERE projects.name = ?1 AND pages.name = ?2",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let row = stmt
                    .query_row((&project, &name), |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Option<i64>>(1)?,
                            row.get::<_, Option<Vec<u8>>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                        ))
                    })
                    .optional()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(row)
            })
            .await
            .map_err(storage_error)?;

        let Some((id, status, html, markdown)) = row else {
            return Ok(None);
        };
        let html = html.as_deref().map(decompress_html).transpose()?;
        Ok(Some(PageRecord {
            id,
            status: status.map(|s| s as u16),
            html,
            markdown,
        }))
    }

    /// Records a fetch outcome: the terminal status plus the compressed HTML
    /// payload (present only on success).
    pub async fn set_page_fetch(
        &self,
        page_id: i64,
        status: u16,
        html: Option<&str>,
    ) -> Result<(), RagError> {
        let blob = html.map(compress_html).transpose()?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE pages SET status = ?1, html = ?2 WHERE id = ?3",
                    (status as i64, &blob, page_id),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(storage_error)
    }

    /// Applies a batch of fetch outcomes in a single transaction.
    pub async fn apply_fetch_batch(
        &self,
        updates: Vec<PageFetchUpdate>,
    ) -> Result<(), RagError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(updates.len());
        for update in updates {
            let blob = update.html.as_deref().map(compress_html).transpose()?;
            rows.push((update.page_id, update.status as i64, blob));
        }
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare("UPDATE pages SET status = ?2, html = ?3 WHERE id = ?1")
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for (page_id, status, blob) in &rows {
                        stmt.execute((page_id, status, blob))
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(storage_error)
    }

    /// Stores the markdown derived from a page's HTML.
    pub async fn set_page_markdown(&self, page_id: i64, markdown: &str) -> Result<(), RagError> {
        let markdown = markdown.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE pages SET markdown = ?1 WHERE id = ?2",
                    (&markdown, page_id),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(storage_error)
    }

    /// Inserts chunks for a page in one transaction, returning their rowids.
    pub async fn insert_chunks(
        &self,
        page_id: i64,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<i64>, RagError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(String, i64, Option<Vec<u8>>)> = chunks
            .into_iter()
            .map(|chunk| {
                let blob = chunk.vector.as_deref().map(vector_to_blob);
                (chunk.text, chunk.status as i64, blob)
            })
            .collect();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut ids = Vec::with_capacity(rows.len());
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO chunks (page_id, text, status, embedding) \
                             VALUES (?1, ?2, ?3, ?4)",
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for (text, status, blob) in &rows {
                        stmt.execute((page_id, text, status, blob))
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        ids.push(tx.last_insert_rowid());
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(ids)
            })
            .await
            .map_err(storage_error)
    }

    /// Loads `(chunk id, vector)` pairs for every successfully embedded
    /// chunk, optionally restricted to one page. This is the scan the vector
    /// index is rebuilt from.
    pub async fn embedded_chunks(
        &self,
        page_id: Option<i64>,
    ) -> Result<Vec<(i64, Vec<f32>)>, RagError> {
        let raw = self
            .conn
            .call(move |conn| {
                let mut out: Vec<(i64, Vec<u8>)> = Vec::new();
                match page_id {
                    Some(page_id) => {
                        let mut stmt = conn
                            .prepare(
                                "SELECT id, embedding FROM chunks \
                                 WHERE page_id = ?1 AND status = ?2 AND embedding IS NOT NULL",
                            )
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        let rows = stmt
                            .query_map((page_id, EMBED_OK), |row| {
                                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                            })
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        for row in rows {
                            out.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                        }
                    }
                    None => {
                        let mut stmt = conn
                            .prepare(
                                "SELECT id, embedding FROM chunks \
                                 WHERE status = ?1 AND embedding IS NOT NULL",
                            )
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        let rows = stmt
                            .query_map([EMBED_OK], |row| {
                                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                            })
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                        for row in rows {
                            out.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                        }
                    }
                }
                Ok(out)
            })
            .await
            .map_err(storage_error)?;

        Ok(raw
            .into_iter()
            .map(|(id, blob)| (id, blob_to_vector(&blob)))
            .collect())
    }

    /// Fetches one chunk's text by rowid.
    pub async fn chunk_text(&self, chunk_id: i64) -> Result<Option<String>, RagError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT text FROM chunks WHERE id = ?1")
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                stmt.query_row([chunk_id], |row| row.get(0))
                    .optional()
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map_err(storage_error)
    }

    /// The most popular pages, fetched or not, best-viewed first.
    pub async fn top_pages(&self, limit: u32) -> Result<Vec<FetchCandidate>, RagError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT pages.id, projects.name, pages.name, pages.status \
                         FROM pages \
                         INNER JOIN projects ON pages.project_id = projects.id \
                         ORDER BY pages.views DESC LIMIT ?1",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([limit as i64], |row| {
                        Ok(FetchCandidate {
                            id: row.get(0)?,
                            project_name: row.get(1)?,
                            page_name: row.get(2)?,
                            status: row.get::<_, Option<i64>>(3)?.map(|s| s as u16),
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(out)
            })
            .await
            .map_err(storage_error)
    }

    /// Pages that were fetched successfully but never extracted.
    pub async fn pages_pending_extraction(&self) -> Result<Vec<PendingPage>, RagError> {
        let raw = self
            .conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, name, html FROM pages \
                         WHERE html IS NOT NULL AND markdown IS NULL",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(out)
            })
            .await
            .map_err(storage_error)?;

        let mut pending = Vec::with_capacity(raw.len());
        for (id, name, blob) in raw {
            pending.push(PendingPage {
                id,
                name,
                html: decompress_html(&blob)?,
            });
        }
        Ok(pending)
    }

    /// Full-text search over chunk text, in FTS5 relevance order.
    /// `match_expr` must already be sanitized.
    pub async fn search_chunks(
        &self,
        match_expr: &str,
        k: usize,
    ) -> Result<Vec<ChunkHit>, RagError> {
        let match_expr = match_expr.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT chunks.id, chunks.text \
                         FROM chunks \
                         INNER JOIN chunks_fts ON chunks_fts.rowid = chunks.id \
                         WHERE chunks_fts MATCH ?1 \
                         ORDER BY chunks_fts.rank \
                         LIMIT ?2",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map((&match_expr, k as i64), |row| {
                        Ok(ChunkHit {
                            id: row.get(0)?,
                            text: row.get(1)?,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(out)
            })
            .await
            .map_err(storage_error)
    }

    /// Full-text search over page names with a popularity floor, ordered by
    /// relevance then views. `match_expr` must already be sanitized.
    pub async fn search_pages(
        &self,
        match_expr: &str,
        min_views: i64,
        k: usize,
    ) -> Result<Vec<PageHit>, RagError> {
        let match_expr = match_expr.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT pages.id, projects.name, pages.name, pages.views, pages.status \
                         FROM pages \
                         INNER JOIN projects ON pages.project_id = projects.id \
                         INNER JOIN pages_fts ON pages_fts.rowid = pages.id \
                         WHERE pages_fts MATCH ?1 AND pages.views >= ?2 \
                         ORDER BY pages_fts.rank, pages.views DESC \
                         LIMIT ?3",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map((&match_expr, min_views, k as i64), |row| {
                        Ok(PageHit {
                            page_id: row.get(0)?,
                            project_name: row.get(1)?,
                            page_name: row.get(2)?,
                            views: row.get(3)?,
                            status: row.get::<_, Option<i64>>(4)?.map(|s| s as u16),
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(out)
            })
            .await
            .map_err(storage_error)
    }

    /// Total number of stored chunks.
    pub async fn chunk_count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(storage_error)
    }

    /// Total number of registered pages.
    pub async fn page_count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(storage_error)
    }
}

fn storage_error(err: tokio_rusqlite::Error) -> RagError {
    RagError::Storage(err.to_string())
}

fn compress_html(html: &str) -> Result<Vec<u8>, RagError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(html.as_bytes())?;
    Ok(encoder.finish()?)
}

fn decompress_html(blob: &[u8]) -> Result<String, RagError> {
    let mut decoder = ZlibDecoder::new(blob);
    let mut html = String::new();
    decoder.read_to_string(&mut html)?;
    Ok(html)
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_page(project: &str, name: &str) -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.register_page(project, name).await.unwrap();
        let page = store.find_page(project, name).await.unwrap().unwrap();
        (store, page.id)
    }

    #[tokio::test]
    async fn page_registration_is_insert_if_absent() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.register_page("en.wikipedia", "Ozone").await.unwrap();
        store.register_page("en.wikipedia", "Ozone").await.unwrap();
        assert_eq!(store.page_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fetch_status_and_html_round_trip() {
        let (store, page_id) = store_with_page("en.wikipedia", "Ozone").await;
        let html = "<h1>Ozone</h1><p>O3</p>";
        store.set_page_fetch(page_id, 200, Some(html)).await.unwrap();
        let page = store
            .find_page("en.wikipedia", "Ozone")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.status, Some(200));
        assert_eq!(page.html.as_deref(), Some(html));
        assert!(page.markdown.is_none());
    }

    #[tokio::test]
    async fn failed_fetch_stores_status_without_html() {
        let (store, page_id) = store_with_page("en.wikipedia", "Missing").await;
        store.set_page_fetch(page_id, 404, None).await.unwrap();
        let page = store
            .find_page("en.wikipedia", "Missing")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.status, Some(404));
        assert!(page.html.is_none());
    }

    #[tokio::test]
    async fn vector_blobs_round_trip_exactly() {
        let (store, page_id) = store_with_page("en.wikipedia", "Ozone").await;
        let vector = vec![0.125_f32, -2.5, 3.25, 1.0e-7];
        let ids = store
            .insert_chunks(
                page_id,
                vec![NewChunk {
                    text: "Ozone: O3".to_string(),
                    status: 200,
                    vector: Some(vector.clone()),
                }],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        let loaded = store.embedded_chunks(Some(page_id)).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, ids[0]);
        assert_eq!(loaded[0].1, vector);
    }

    #[tokio::test]
    async fn lexical_search_matches_chunk_text() {
        let (store, page_id) = store_with_page("en.wikipedia", "Fox").await;
        store
            .insert_chunks(
                page_id,
                vec![
                    NewChunk {
                        text: "the quick brown fox".to_string(),
                        status: 200,
                        vector: Some(vec![0.0, 1.0]),
                    },
                    NewChunk {
                        text: "a slow green turtle".to_string(),
                        status: 200,
                        vector: Some(vec![1.0, 0.0]),
                    },
                ],
            )
            .await
            .unwrap();
        let hits = store
            .search_chunks("\"quick\" AND \"fox\"", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "the quick brown fox");
    }

    #[tokio::test]
    async fn page_search_applies_popularity_floor() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .store_pages(
                "en.wikipedia",
                vec![
                    ("Berlin Wall".to_string(), 5_000),
                    ("Berlin Ring".to_string(), 10),
                ],
            )
            .await
            .unwrap();
        let hits = store.search_pages("\"berlin\"", 1_000, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page_name, "Berlin Wall");
        assert_eq!(hits[0].project_name, "en.wikipedia");
        assert_eq!(hits[0].views, 5_000);
        assert_eq!(hits[0].status, None);
    }

    #[tokio::test]
    async fn embedded_chunk_scan_skips_unembedded_rows() {
        let (store, page_id) = store_with_page("en.wikipedia", "Mix").await;
        store
            .insert_chunks(
                page_id,
                vec![
                    NewChunk {
                        text: "good".to_string(),
                        status: 200,
                        vector: Some(vec![1.0, 0.0]),
                    },
                    NewChunk {
                        text: "bad".to_string(),
                        status: 500,
                        vector: None,
                    },
                ],
            )
            .await
            .unwrap();
        let loaded = store.embedded_chunks(None).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), 2);
    }
}
