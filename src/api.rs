//! HTTP surface for Trend Lens.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /analyze` – Run the analysis pipeline over a stored batch. Accepts `batch` and an
//!   optional `model`; always answers `200` with the response envelope, failures included.
//! - `GET /analyses/:name` – Return a persisted analysis document, or `404` when missing.
//! - `GET /models` – List installed text-generation models.
//! - `GET /metrics` – Observe analysis counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::analysis::{AnalysisApi, AnalysisEnvelope, AnalysisError, AnalysisResult};
use crate::insights::ModelInfo;
use crate::metrics::MetricsSnapshot;
use crate::storage::StoreError;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/analyze", post(analyze_batch::<S>))
        .route("/analyses/:name", get(get_analysis::<S>))
        .route("/models", get(list_models::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /analyze` endpoint.
#[derive(Deserialize)]
struct AnalyzeRequest {
    /// Batch file name inside the data directory.
    batch: String,
    /// Optional text-generation model override (defaults to `ANALYSIS_MODEL`).
    #[serde(default)]
    model: Option<String>,
}

/// Analyze a stored batch.
///
/// Pipeline failures are carried inside the envelope (`success: false`), so the status is
/// always `200` once the request body parses.
async fn analyze_batch<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<AnalysisEnvelope>
where
    S: AnalysisApi,
{
    let envelope = service
        .analyze(&request.batch, request.model.as_deref())
        .await;
    tracing::info!(
        batch = %request.batch,
        success = envelope.success,
        "Analyze request completed"
    );
    Json(envelope)
}

/// Return a persisted analysis document.
async fn get_analysis<S>(
    State(service): State<Arc<S>>,
    Path(name): Path<String>,
) -> Result<Json<AnalysisResult>, AppError>
where
    S: AnalysisApi,
{
    let result = service.load_analysis(&name).await?;
    Ok(Json(result))
}

/// Response body for `GET /models`.
#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// List installed text-generation models; empty when the runtime is unreachable.
async fn list_models<S>(State(service): State<Arc<S>>) -> Json<ModelsResponse>
where
    S: AnalysisApi,
{
    Json(ModelsResponse {
        models: service.list_models().await,
    })
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Cluster a stored batch, generate insights, and persist the result. Response returns { \"success\": bool, \"analysis\": {...}, \"stats\": {...}, \"filename\": string }.",
                request_example: Some(json!({
                    "batch": "reddit_batch.json",
                    "model": "qwen2.5:14b"
                })),
            },
            CommandDescriptor {
                name: "get_analysis",
                method: "GET",
                path: "/analyses/:name",
                description: "Return a previously persisted analysis document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "models",
                method: "GET",
                path: "/models",
                description: "List installed text-generation models, largest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return analysis counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(AnalysisError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AnalysisError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AnalysisError::Store(StoreError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(inner: AnalysisError) -> Self {
        Self(inner)
    }
}
