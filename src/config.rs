//! Runtime configuration with environment overrides.
//!
//! Defaults match a local Ollama setup with the `bge-m3` embedding model.
//! `from_env` loads a `.env` file when present and then applies environment
//! variables on top of the defaults.

use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::retrieval::SimilarityGate;
use crate::types::RagError;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct RagConfig {
    /// SQLite database path (`WIKISMITH_DB`).
    pub db_path: PathBuf,
    /// Base URL of the embedding service (`OLLAMA_URL`).
    pub ollama_url: Url,
    /// Embedding model name (`EMBED_MODEL`).
    pub embed_model: String,
    /// Embedding vector width (`EMBED_DIMENSION`).
    pub dimension: usize,
    /// Semantic similarity gate (`GATE_PRIMARY`, `GATE_FOLLOW_UP`).
    pub gate: SimilarityGate,
    /// Vector search fetches `k * oversample` candidates before gating.
    pub oversample: usize,
    /// Result count used by the consumer-facing query operations.
    pub default_k: usize,
    /// Popularity floor for document search (`MIN_PAGE_VIEWS`).
    pub min_views: i64,
    /// User agent for page fetches.
    pub user_agent: String,
    /// Optional replacement for `https://{project}.org` (`WIKI_BASE_URL`),
    /// used by tests and mirrors.
    pub wiki_base_url: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/rag.db"),
            ollama_url: Url::parse(DEFAULT_OLLAMA_URL).expect("default ollama url"),
            embed_model: "bge-m3".to_string(),
            dimension: 1024,
            gate: SimilarityGate::default(),
            oversample: 4,
            default_k: 5,
            min_views: 1_000,
            user_agent: "Mozilla/5.0".to_string(),
            wiki_base_url: None,
        }
    }
}

impl RagConfig {
    /// Builds a config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, RagError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(path) = std::env::var("WIKISMITH_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(url) = parsed_var::<Url>("OLLAMA_URL")? {
            config.ollama_url = url;
        }
        if let Ok(model) = std::env::var("EMBED_MODEL") {
            config.embed_model = model;
        }
        if let Some(dimension) = parsed_var::<usize>("EMBED_DIMENSION")? {
            config.dimension = dimension;
        }
        if let Some(primary) = parsed_var::<f32>("GATE_PRIMARY")? {
            config.gate.primary = primary;
        }
        if let Some(follow_up) = parsed_var::<f32>("GATE_FOLLOW_UP")? {
            config.gate.follow_up = follow_up;
        }
        if let Some(min_views) = parsed_var::<i64>("MIN_PAGE_VIEWS")? {
            config.min_views = min_views;
        }
        if let Ok(base) = std::env::var("WIKI_BASE_URL") {
            config.wiki_base_url = Some(base);
        }
        Ok(config)
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Result<Option<T>, RagError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| RagError::Config(format!("{name}: {err}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_ollama() {
        let config = RagConfig::default();
        assert_eq!(config.ollama_url.as_str(), "http://localhost:11434/");
        assert_eq!(config.embed_model, "bge-m3");
        assert_eq!(config.dimension, 1024);
        assert_eq!(config.gate, SimilarityGate { primary: 0.60, follow_up: 0.65 });
        assert_eq!(config.default_k, 5);
        assert_eq!(config.min_views, 1_000);
    }
}
