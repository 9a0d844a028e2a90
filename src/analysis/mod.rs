//! Analysis pipeline: extraction, clustering, summarization, and orchestration.
//!
//! Each stage lives in its own module; [`Analyzer`] wires them together and is the only place
//! where failures are converted into the response envelope.

pub mod cluster;
pub mod extract;
pub mod service;
pub mod summarize;
pub mod types;

pub use cluster::{
    ClusterEngine, ClusteringError, DEFAULT_EPS, DEFAULT_MIN_NEIGHBORS, DbscanParams,
    cosine_distance, dbscan, singleton_partition,
};
pub use extract::{BatchDocument, ExtractError, extract_text_content};
pub use service::{AnalysisApi, Analyzer};
pub use summarize::{engagement_score, summarize_clusters};
pub use types::{
    AnalysisEnvelope, AnalysisError, AnalysisResult, AnalysisStats, Cluster, ClusterOutcome,
    ClusterSummary, ContentItem, ItemMetadata, Source,
};
