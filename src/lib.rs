#![deny(missing_docs)]

//! Core library for the Trend Lens analysis service.

/// Extraction, clustering, summarization, and the analysis orchestrator.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding models and the lazily-loaded provider.
pub mod embedding;
/// Insight generation and the model registry.
pub mod insights;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis metrics helpers.
pub mod metrics;
/// File-backed batch and analysis storage.
pub mod storage;
