use super::{EmbeddingError, EmbeddingLoader, EmbeddingModel};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const WARM_UP_INPUT: &str = "warm-up";
const EMBED_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding model served by an Ollama runtime through `POST /api/embed`.
pub struct OllamaEmbeddingModel {
    http: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingModel {
    /// Vector size observed while loading the model.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    fn endpoint(&self) -> String {
        embed_endpoint(&self.base_url)
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddingModel {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tracing::debug!(model = %self.model, count = texts.len(), "Requesting embeddings");
        let vectors = request_embeddings(&self.http, &self.endpoint(), &self.model, texts).await?;
        if let Some((index, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, vector)| vector.len() != self.dimension)
        {
            return Err(EmbeddingError::GenerationFailed(format!(
                "model '{}' returned dimension {} for input {index}, expected {}",
                self.model,
                vector.len(),
                self.dimension
            )));
        }
        Ok(vectors)
    }
}

/// Loads an Ollama embedding model by issuing a warm-up request.
///
/// A successful warm-up proves the runtime is reachable and the model is pulled, and records the
/// vector dimension. Any failure leaves the provider unavailable.
pub struct OllamaEmbeddingLoader {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingLoader {
    /// Build a loader targeting `base_url` for `model`.
    pub fn new(base_url: &str, model: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("trend-lens/embed")
            .timeout(EMBED_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingLoader for OllamaEmbeddingLoader {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
        let probe = request_embeddings(
            &self.http,
            &embed_endpoint(&self.base_url),
            &self.model,
            &[WARM_UP_INPUT.to_string()],
        )
        .await
        .map_err(|error| EmbeddingError::Unavailable(error.to_string()))?;

        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(EmbeddingError::Unavailable(format!(
                "model '{}' returned no embedding for the warm-up request",
                self.model
            )));
        }

        Ok(Arc::new(OllamaEmbeddingModel {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            dimension,
        }))
    }
}

fn embed_endpoint(base_url: &str) -> String {
    format!("{}/api/embed", base_url.trim_end_matches('/'))
}

async fn request_embeddings(
    http: &Client,
    endpoint: &str,
    model: &str,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let response = http
        .post(endpoint)
        .json(&json!({ "model": model, "input": texts }))
        .send()
        .await
        .map_err(|error| {
            EmbeddingError::GenerationFailed(format!("failed to reach Ollama at {endpoint}: {error}"))
        })?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(EmbeddingError::GenerationFailed(format!(
            "Ollama model '{model}' not found at {endpoint}"
        )));
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(EmbeddingError::GenerationFailed(format!(
            "Ollama returned {status}: {body}"
        )));
    }

    let body: EmbedResponse = response.json().await.map_err(|error| {
        EmbeddingError::GenerationFailed(format!("failed to decode Ollama embeddings: {error}"))
    })?;
    Ok(body.embeddings)
}
