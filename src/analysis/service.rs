//! Analyzer coordinating extraction, clustering, summarization, insights, and persistence.

use super::{
    cluster::ClusterEngine,
    extract::extract_text_content,
    summarize::summarize_clusters,
    types::{AnalysisEnvelope, AnalysisError, AnalysisResult, AnalysisStats, Source},
};
use crate::{
    config::Config,
    embedding::build_embedding_provider,
    insights::{InsightGenerator, ModelInfo, ModelRegistry},
    metrics::{AnalysisMetrics, MetricsSnapshot},
    storage::BatchStore,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Runs the analysis pipeline over stored batch documents.
///
/// The analyzer owns the embedding provider (through its [`ClusterEngine`]) so that the model is
/// loaded at most once and shared by every run. Construct it once near process start and share it
/// through an `Arc`.
pub struct Analyzer {
    store: BatchStore,
    engine: ClusterEngine,
    insights: InsightGenerator,
    registry: ModelRegistry,
    metrics: Arc<AnalysisMetrics>,
    default_model: String,
}

/// Abstraction over the analyzer used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Analyze a stored batch and persist the result.
    async fn analyze(&self, batch_id: &str, model_id: Option<&str>) -> AnalysisEnvelope;

    /// Load a previously persisted analysis.
    async fn load_analysis(&self, name: &str) -> Result<AnalysisResult, AnalysisError>;

    /// Installed text-generation models.
    async fn list_models(&self) -> Vec<ModelInfo>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl Analyzer {
    /// Assemble an analyzer from its components.
    pub fn new(
        store: BatchStore,
        engine: ClusterEngine,
        insights: InsightGenerator,
        registry: ModelRegistry,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            engine,
            insights,
            registry,
            metrics: Arc::new(AnalysisMetrics::new()),
            default_model: default_model.into(),
        }
    }

    /// Build an analyzer from configuration. No network access happens until the first run.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        tracing::info!(
            data_dir = %config.data_dir.display(),
            ollama_url = %config.ollama_url,
            "Initializing analyzer"
        );
        let engine = ClusterEngine::new(build_embedding_provider(config)?);
        let insights = InsightGenerator::from_config(config)?;
        let registry = ModelRegistry::new(&config.ollama_url)?;
        Ok(Self::new(
            BatchStore::new(config.data_dir.clone()),
            engine,
            insights,
            registry,
            config.analysis_model.clone(),
        ))
    }

    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Underlying document store.
    pub const fn store(&self) -> &BatchStore {
        &self.store
    }

    /// Analyze `batch_id` with `model_id` (or the default model).
    ///
    /// Never fails: every hard error is reported through a failure envelope with empty insights.
    pub async fn analyze(&self, batch_id: &str, model_id: Option<&str>) -> AnalysisEnvelope {
        let model = model_id
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(&self.default_model);
        tracing::info!(batch = batch_id, model, "Starting analysis");

        match self.run(batch_id, model).await {
            Ok((result, filename)) => {
                tracing::info!(
                    batch = batch_id,
                    file = %filename,
                    total_items = result.stats.total_items,
                    clusters_found = result.stats.clusters_found,
                    meaningful_clusters = result.stats.meaningful_clusters,
                    "Analysis complete"
                );
                AnalysisEnvelope::succeeded(result.insights, result.stats, filename)
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::error!(batch = batch_id, error = %error, "Analysis failed");
                AnalysisEnvelope::failed(error.to_string())
            }
        }
    }

    async fn run(
        &self,
        batch_id: &str,
        model: &str,
    ) -> Result<(AnalysisResult, String), AnalysisError> {
        let document = self.store.load_batch(batch_id).await?;
        let items = extract_text_content(document)?;
        if items.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        tracing::info!(batch = batch_id, items = items.len(), "Extracted content items");

        let outcome = self.engine.cluster(&items).await;
        let summaries = summarize_clusters(outcome.clusters());
        let insights = self.insights.generate(&summaries, model).await;

        let sources: BTreeSet<Source> = items.iter().map(|item| item.source).collect();
        let stats = AnalysisStats {
            total_items: items.len(),
            clusters_found: outcome.clusters().len(),
            meaningful_clusters: summaries.len(),
            sources: sources.into_iter().collect(),
        };
        let result = AnalysisResult {
            source_file: batch_id.to_string(),
            analyzed_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            model: model.to_string(),
            stats,
            insights,
        };

        let filename = self.store.save_analysis(batch_id, &result).await?;
        self.metrics
            .record_success(items.len() as u64, outcome.is_degraded());
        Ok((result, filename))
    }

    /// Load a persisted analysis document by file name.
    pub async fn load_analysis(&self, name: &str) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.store.load_analysis(name).await?)
    }

    /// Installed text-generation models, largest first.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        self.registry.list_models().await
    }

    /// Current analysis counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl AnalysisApi for Analyzer {
    async fn analyze(&self, batch_id: &str, model_id: Option<&str>) -> AnalysisEnvelope {
        Analyzer::analyze(self, batch_id, model_id).await
    }

    async fn load_analysis(&self, name: &str) -> Result<AnalysisResult, AnalysisError> {
        Analyzer::load_analysis(self, name).await
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        Analyzer::list_models(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        Analyzer::metrics_snapshot(self)
    }
}
