use super::{EmbeddingError, EmbeddingLoader, EmbeddingModel};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

enum ModelState {
    Unloaded,
    Loaded(Arc<dyn EmbeddingModel>),
    Failed(String),
}

/// Observable availability of the embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// No load has been attempted yet.
    Unloaded,
    /// The model loaded and is cached.
    Loaded,
    /// The single load attempt failed; the model stays unavailable.
    Failed,
}

/// Lazily loads an embedding model once and caches the outcome.
///
/// The `Unloaded → Loaded | Failed` transition happens under an async mutex, so concurrent first
/// use performs exactly one load while other callers wait and then observe the cached state. A
/// failed load is never retried for the lifetime of the provider.
pub struct EmbeddingProvider {
    loader: Box<dyn EmbeddingLoader>,
    state: Mutex<ModelState>,
}

impl EmbeddingProvider {
    /// Wrap a loader; nothing is loaded until first use.
    pub fn new(loader: impl EmbeddingLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            state: Mutex::new(ModelState::Unloaded),
        }
    }

    /// Load the model if no attempt has been made yet and return the cached outcome.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
        let mut state = self.state.lock().await;
        match &*state {
            ModelState::Loaded(model) => return Ok(Arc::clone(model)),
            ModelState::Failed(reason) => return Err(EmbeddingError::Unavailable(reason.clone())),
            ModelState::Unloaded => {}
        }

        let model_name = self.loader.model_name().to_string();
        tracing::info!(model = %model_name, "Loading embedding model");
        match self.loader.load().await {
            Ok(model) => {
                *state = ModelState::Loaded(Arc::clone(&model));
                tracing::info!(model = %model_name, "Embedding model loaded");
                Ok(model)
            }
            Err(error) => {
                let reason = error.to_string();
                tracing::warn!(
                    model = %model_name,
                    error = %reason,
                    "Embedding model failed to load; clustering will degrade"
                );
                *state = ModelState::Failed(reason.clone());
                Err(EmbeddingError::Unavailable(reason))
            }
        }
    }

    /// Current state without triggering a load.
    pub async fn status(&self) -> ProviderStatus {
        match &*self.state.lock().await {
            ModelState::Unloaded => ProviderStatus::Unloaded,
            ModelState::Loaded(_) => ProviderStatus::Loaded,
            ModelState::Failed(_) => ProviderStatus::Failed,
        }
    }

    /// Embed texts in order, loading the model on first use.
    ///
    /// The result always holds one vector per input and every vector shares one non-zero
    /// dimension; anything else is reported as [`EmbeddingError::GenerationFailed`].
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = self.ensure_loaded().await?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = model.embed(texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::GenerationFailed(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(EmbeddingError::GenerationFailed(
                "model returned empty vectors".into(),
            ));
        }
        if let Some(index) = vectors.iter().position(|vector| vector.len() != dimension) {
            return Err(EmbeddingError::GenerationFailed(format!(
                "vector {index} has dimension {}, expected {dimension}",
                vectors[index].len()
            )));
        }

        Ok(vectors)
    }
}
