//! Core data types and error definitions for the analysis pipeline.

use crate::analysis::extract::ExtractError;
use crate::insights::Insights;
use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Origin of a piece of scraped content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Reddit submissions.
    Reddit,
    /// Twitter/X posts.
    Twitter,
}

impl Source {
    /// Stable lowercase identifier used in prompts and persisted documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reddit => "reddit",
            Self::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-specific identifiers and interaction counters attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemMetadata {
    /// Counters reported for a Reddit submission.
    Reddit {
        /// Subreddit the submission was posted to.
        subreddit: String,
        /// Net vote score.
        score: i64,
        /// Number of comments on the submission.
        num_comments: i64,
        /// Permalink or outbound URL.
        url: String,
    },
    /// Counters reported for a tweet.
    Twitter {
        /// Like count.
        likes: i64,
        /// Retweet count.
        retweets: i64,
        /// Reply count.
        replies: i64,
    },
}

/// Normalized text unit produced by the extractor.
///
/// Items are never mutated after extraction; clustering and summarization only reorder or
/// group references to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Trimmed, non-empty text body.
    pub text: String,
    /// Platform the item was scraped from.
    pub source: Source,
    /// Engagement counters and identifiers for the item.
    pub metadata: ItemMetadata,
}

/// Group of content items produced by one clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Label unique within the run.
    pub label: String,
    /// Members in extraction order.
    pub members: Vec<ContentItem>,
    /// `true` for noise points and fallback singletons.
    pub degraded: bool,
}

/// Result of a clustering pass, recording which path produced the partition.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterOutcome {
    /// Density-based clustering ran over real embeddings.
    Clustered(Vec<Cluster>),
    /// Embeddings were unavailable or clustering failed; every item is its own cluster.
    Degraded {
        /// Singleton clusters, one per input item.
        clusters: Vec<Cluster>,
        /// Why the fallback partition was used.
        reason: String,
    },
}

impl ClusterOutcome {
    /// Clusters covering every input item exactly once.
    pub fn clusters(&self) -> &[Cluster] {
        match self {
            Self::Clustered(clusters) | Self::Degraded { clusters, .. } => clusters,
        }
    }

    /// Whether the fallback partition was produced.
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Aggregate view of one meaningful cluster used to build the insight prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Label of the summarized cluster.
    pub cluster_id: String,
    /// Number of members in the cluster.
    pub size: usize,
    /// Up to three excerpts of the most engaging members.
    pub representative_texts: Vec<String>,
    /// Distinct sources present in the cluster.
    pub sources: Vec<Source>,
    /// Engagement summed over every member.
    pub total_engagement: i64,
}

/// Counters describing a completed analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Number of extracted content items.
    pub total_items: usize,
    /// Number of clusters including noise and fallback singletons.
    pub clusters_found: usize,
    /// Number of clusters that were summarized.
    pub meaningful_clusters: usize,
    /// Distinct sources observed in the batch.
    pub sources: Vec<Source>,
}

/// Persisted analysis document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Batch file the analysis was computed from.
    pub source_file: String,
    /// RFC 3339 timestamp of the run.
    pub analyzed_at: String,
    /// Text-generation model used for insights.
    pub model: String,
    /// Pipeline counters.
    pub stats: AnalysisStats,
    /// Insights returned by the language model (or the empty fallback).
    pub insights: Insights,
}

/// Response envelope returned by [`crate::analysis::Analyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    /// Whether the pipeline completed and the result was persisted.
    pub success: bool,
    /// Insights, empty on failure.
    pub analysis: Insights,
    /// Pipeline counters, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<AnalysisStats>,
    /// Name of the persisted analysis document, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Failure description, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisEnvelope {
    /// Envelope for a completed run.
    pub fn succeeded(analysis: Insights, stats: AnalysisStats, filename: String) -> Self {
        Self {
            success: true,
            analysis,
            stats: Some(stats),
            filename: Some(filename),
            error: None,
        }
    }

    /// Envelope for an aborted run.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            analysis: Insights::default(),
            stats: None,
            filename: None,
            error: Some(error.into()),
        }
    }
}

/// Hard failures that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Extraction produced no content items.
    #[error("No text content found in batch file")]
    EmptyInput,
    /// Batch document could not be interpreted.
    #[error("Invalid batch document: {0}")]
    InvalidBatch(#[from] ExtractError),
    /// Reading or persisting an artifact failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Analysis timestamp could not be rendered.
    #[error("Failed to format analysis timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl AnalysisError {
    /// Whether the failure stems from a missing artifact.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound(_)))
    }
}
