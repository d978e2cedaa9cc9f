//! Embedding collaborator: trait, Ollama-backed client, and a deterministic
//! mock for tests and offline development.
//!
//! The collaborator's failures are data, not errors: a non-success HTTP
//! response surfaces as [`EmbeddingReply::status`] with no vectors, so the
//! ingestion pipeline can persist partial progress. Only transport-level
//! failures (connect, DNS, body decode) become [`RagError`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RagError;

/// Outcome of an embedding call: the collaborator's status code plus the
/// vectors, present only on success.
#[derive(Debug, Clone)]
pub struct EmbeddingReply {
    pub status: u16,
    pub vectors: Option<Vec<Vec<f32>>>,
}

impl EmbeddingReply {
    /// Returns the vectors if the collaborator reported success.
    pub fn into_vectors(self) -> Option<Vec<Vec<f32>>> {
        if self.status == 200 { self.vectors } else { None }
    }
}

/// Abstraction over the embedding collaborator.
///
/// One document's chunks are always embedded as a single batch; the batch
/// either succeeds as a whole or fails as a whole.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts in one request.
    async fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingReply, RagError>;

    /// Embeds a single text (used for queries).
    async fn embed_one(&self, input: &str) -> Result<EmbeddingReply, RagError> {
        let inputs = [input.to_string()];
        self.embed_batch(&inputs).await
    }
}

#[derive(Serialize)]
struct SingleRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct SingleResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct BatchResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding client speaking the Ollama HTTP API.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddings {
    client: Client,
    base_url: Url,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(client: Client, base_url: Url, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            model: model.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, RagError> {
        self.base_url
            .join(path)
            .map_err(|err| RagError::Config(format!("bad embedding endpoint {path}: {err}")))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    async fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingReply, RagError> {
        let url = self.endpoint("api/embed")?;
        let response = self
            .client
            .post(url)
            .json(&BatchRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(EmbeddingReply {
                status,
                vectors: None,
            });
        }
        let body: BatchResponse = response.json().await?;
        Ok(EmbeddingReply {
            status,
            vectors: Some(body.embeddings),
        })
    }

    async fn embed_one(&self, input: &str) -> Result<EmbeddingReply, RagError> {
        let url = self.endpoint("api/embeddings")?;
        let response = self
            .client
            .post(url)
            .json(&SingleRequest {
                model: &self.model,
                prompt: input,
            })
            .send()
            .await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(EmbeddingReply {
                status,
                vectors: None,
            });
        }
        let body: SingleResponse = response.json().await?;
        Ok(EmbeddingReply {
            status,
            vectors: Some(vec![body.embedding]),
        })
    }
}

/// Deterministic embedding provider for tests and offline runs.
///
/// Vectors are derived from a hash of the input text: identical texts embed
/// identically, different texts (almost certainly) differ. Construct with
/// [`failing`](Self::failing) to simulate a collaborator outage.
#[derive(Debug)]
pub struct MockEmbeddings {
    dimension: usize,
    status: u16,
    calls: AtomicUsize,
}

impl MockEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            status: 200,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider whose every call reports `status` and yields no vectors.
    pub fn failing(dimension: usize, status: u16) -> Self {
        Self {
            dimension,
            status,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of embedding requests made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish() | 1;
        (0..self.dimension)
            .map(|_| {
                // xorshift keeps the sequence deterministic per seed
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed as f32 / u64::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddings {
    async fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingReply, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.status != 200 {
            return Ok(EmbeddingReply {
                status: self.status,
                vectors: None,
            });
        }
        let vectors = inputs.iter().map(|text| self.vector_for(text)).collect();
        Ok(EmbeddingReply {
            status: 200,
            vectors: Some(vectors),
        })
    }
}
