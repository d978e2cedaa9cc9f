//! Crate-wide error type.
//!
//! Collaborator failures that carry an HTTP status (a failed page fetch, a
//! rejected embedding batch) are *not* errors: they travel through the
//! pipeline as status values and end up persisted next to the entity they
//! describe. `RagError` covers everything else — broken storage, malformed
//! HTML that violates the parser's balance assumptions, transport-level HTTP
//! failures, and misconfiguration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// SQLite or connection-level failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed HTML that the section parser cannot recover from.
    #[error("parse error: {0}")]
    Parse(String),

    /// The embedding collaborator returned an unusable payload.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A vector did not match the configured embedding dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    /// Transport-level HTTP failure (DNS, connect, body read). Responses
    /// that arrived with an error status are represented as status codes
    /// instead.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
