//! Insight generation through a remote text-generation service.
//!
//! [`InsightGenerator`] renders cluster summaries into a bounded prompt, sends a single request to
//! the configured provider, and parses the JSON answer. It never fails: transport errors, bad
//! status codes, and unparsable answers all collapse into empty insights with an `error` message.

pub mod prompt;
pub mod registry;
pub mod types;

pub use prompt::{MAX_PROMPT_CLUSTERS, build_insight_prompt};
pub use registry::{ModelCategory, ModelInfo, ModelRegistry};
pub use types::{Insights, Opportunity, PainPoint, Trend, parse_insights};

use crate::analysis::ClusterSummary;
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Sampling temperature used for insight generation.
pub const INSIGHT_TEMPERATURE: f64 = 0.3;

/// Errors surfaced while generating insights.
#[derive(Debug, Error)]
pub enum InsightError {
    /// Provider was unreachable, timed out, or answered with a non-success status.
    #[error("Insight service error: {0}")]
    Service(String),
    /// Provider answered but the payload did not match the requested schema.
    #[error("Invalid JSON response: {0}")]
    MalformedResponse(String),
}

/// Request passed to a text-generation provider.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Ask the provider to constrain output to JSON.
    pub json_output: bool,
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    /// Run one completion and return the raw text answer.
    async fn generate(&self, request: GenerationRequest) -> Result<String, InsightError>;
}

/// Ollama `POST /api/generate` client.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
}

impl OllamaGenerationClient {
    /// Build a client for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("trend-lens/insights")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default = "default_done")]
    done: bool,
}

const fn default_done() -> bool {
    true
}

#[async_trait]
impl TextGenerationClient for OllamaGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, InsightError> {
        let mut payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
            }
        });
        if request.json_output {
            payload["format"] = json!("json");
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                let kind = if error.is_timeout() {
                    "timed out"
                } else {
                    "failed"
                };
                InsightError::Service(format!(
                    "request to Ollama at {} {kind}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(InsightError::Service(format!(
                "Ollama model '{}' not found (404)",
                request.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Service(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            InsightError::MalformedResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(InsightError::MalformedResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

/// Turns cluster summaries into structured insights.
#[derive(Clone)]
pub struct InsightGenerator {
    client: Arc<dyn TextGenerationClient>,
}

impl InsightGenerator {
    /// Wrap an arbitrary text-generation provider.
    pub fn new(client: impl TextGenerationClient + 'static) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Build a generator backed by the configured Ollama runtime.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = OllamaGenerationClient::new(
            &config.ollama_url,
            Duration::from_secs(config.insight_timeout_secs),
        )?;
        Ok(Self::new(client))
    }

    /// Generate insights for `summaries` with `model`.
    ///
    /// An empty summary list returns empty insights without contacting the provider. Only one
    /// request is made per call; failures are reported through [`Insights::error`].
    pub async fn generate(&self, summaries: &[ClusterSummary], model: &str) -> Insights {
        if summaries.is_empty() {
            tracing::info!("No meaningful clusters; skipping insight generation");
            return Insights::default();
        }

        let prompt = build_insight_prompt(summaries);
        tracing::info!(
            model,
            clusters = summaries.len().min(MAX_PROMPT_CLUSTERS),
            prompt_chars = prompt.len(),
            "Requesting insights"
        );

        let request = GenerationRequest {
            model: model.to_string(),
            prompt,
            temperature: INSIGHT_TEMPERATURE,
            json_output: true,
        };
        let result = self
            .client
            .generate(request)
            .await
            .and_then(|raw| parse_insights(&raw));

        match result {
            Ok(insights) => {
                tracing::info!(
                    opportunities = insights.opportunities.len(),
                    trends = insights.trends.len(),
                    pain_points = insights.pain_points.len(),
                    "Insights generated"
                );
                insights
            }
            Err(error) => {
                tracing::warn!(model, error = %error, "Insight generation failed; returning empty insights");
                Insights::failed(error.to_string())
            }
        }
    }
}
