//! Embedding models and the lazily-loaded provider used by the clustering stage.
//!
//! A backend is described by an [`EmbeddingLoader`]; the [`EmbeddingProvider`] drives it through
//! a single load attempt and caches the outcome for the lifetime of the analyzer instance.

mod hashing;
mod ollama;
mod provider;

pub use hashing::{HashingEmbeddingModel, HashingLoader};
pub use ollama::{OllamaEmbeddingLoader, OllamaEmbeddingModel};
pub use provider::{EmbeddingProvider, ProviderStatus};

use crate::config::{Config, EmbeddingBackend};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding backends.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Model could not be loaded, or an earlier load attempt already failed.
    #[error("Embedding model unavailable: {0}")]
    Unavailable(String),
    /// Loaded model was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// A loaded model that maps texts to fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Produce one vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Knows how to bring an [`EmbeddingModel`] online.
#[async_trait]
pub trait EmbeddingLoader: Send + Sync {
    /// Identifier of the model this loader produces, used in logs.
    fn model_name(&self) -> &str;

    /// Attempt to load the model. Called at most once per provider.
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError>;
}

/// Build an embedding provider for the configured backend.
pub fn build_embedding_provider(config: &Config) -> Result<EmbeddingProvider, reqwest::Error> {
    let provider = match config.embedding_provider {
        EmbeddingBackend::Ollama => EmbeddingProvider::new(OllamaEmbeddingLoader::new(
            &config.ollama_url,
            &config.embedding_model,
        )?),
        EmbeddingBackend::Hashing => {
            EmbeddingProvider::new(HashingLoader::new(config.embedding_dimension))
        }
    };
    tracing::debug!(
        backend = ?config.embedding_provider,
        model = %config.embedding_model,
        "Embedding provider configured"
    );
    Ok(provider)
}
