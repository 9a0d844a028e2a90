//! Density-based grouping of content items over embedding vectors.

use super::types::{Cluster, ClusterOutcome, ContentItem};
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use std::collections::HashMap;
use thiserror::Error;

/// Neighborhood radius, in cosine distance.
pub const DEFAULT_EPS: f32 = 0.4;
/// Number of other points that must lie inside the radius for a point to be core.
pub const DEFAULT_MIN_NEIGHBORS: usize = 2;

/// Errors that force the engine onto the fallback partition.
#[derive(Debug, Error)]
pub enum ClusteringError {
    /// Embeddings could not be produced.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// An embedding contained NaN or infinite components.
    #[error("embedding {index} contains non-finite values")]
    NonFinite {
        /// Position of the offending item.
        index: usize,
    },
}

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanParams {
    /// Neighborhood radius in cosine distance.
    pub eps: f32,
    /// Other points required within `eps` for a core point.
    pub min_neighbors: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

/// Groups content items by semantic similarity.
///
/// The engine owns the embedding provider for its analyzer. It never fails: when embeddings are
/// unavailable or clustering breaks, every item becomes its own degraded cluster.
pub struct ClusterEngine {
    provider: EmbeddingProvider,
    params: DbscanParams,
}

impl ClusterEngine {
    /// Build an engine with the default DBSCAN parameters.
    pub fn new(provider: EmbeddingProvider) -> Self {
        Self::with_params(provider, DbscanParams::default())
    }

    /// Build an engine with explicit DBSCAN parameters.
    pub const fn with_params(provider: EmbeddingProvider, params: DbscanParams) -> Self {
        Self { provider, params }
    }

    /// Embedding provider backing this engine.
    pub const fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Partition `items` into clusters covering every item exactly once.
    pub async fn cluster(&self, items: &[ContentItem]) -> ClusterOutcome {
        if items.is_empty() {
            return ClusterOutcome::Clustered(Vec::new());
        }

        match self.try_cluster(items).await {
            Ok(clusters) => {
                tracing::info!(
                    items = items.len(),
                    clusters = clusters.len(),
                    dense = clusters.iter().filter(|cluster| !cluster.degraded).count(),
                    "Clustering complete"
                );
                ClusterOutcome::Clustered(clusters)
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    items = items.len(),
                    "Clustering unavailable; using singleton partition"
                );
                ClusterOutcome::Degraded {
                    clusters: singleton_partition(items),
                    reason: error.to_string(),
                }
            }
        }
    }

    async fn try_cluster(&self, items: &[ContentItem]) -> Result<Vec<Cluster>, ClusteringError> {
        let texts: Vec<String> = items.iter().map(|item| item.text.clone()).collect();
        let embeddings = self.provider.embed(&texts).await?;
        if let Some(index) = embeddings
            .iter()
            .position(|vector| vector.iter().any(|value| !value.is_finite()))
        {
            return Err(ClusteringError::NonFinite { index });
        }

        let labels = dbscan(&embeddings, self.params);
        Ok(group_by_label(items, &labels))
    }
}

/// Every item in its own degraded cluster, labeled by position.
pub fn singleton_partition(items: &[ContentItem]) -> Vec<Cluster> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| Cluster {
            label: format!("item_{index}"),
            members: vec![item.clone()],
            degraded: true,
        })
        .collect()
}

/// Cosine distance in `[0, 2]`; a zero vector is maximally distant from everything.
pub fn cosine_distance(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (left_norm * right_norm)).clamp(0.0, 2.0)
}

/// Label each vector with a cluster index, or `None` for noise.
///
/// Clusters are numbered in discovery order while scanning points by index. Core points expand
/// their cluster; border points join the first cluster that reaches them.
pub fn dbscan(vectors: &[Vec<f32>], params: DbscanParams) -> Vec<Option<usize>> {
    let count = vectors.len();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); count];
    for i in 0..count {
        for j in (i + 1)..count {
            if cosine_distance(&vectors[i], &vectors[j]) <= params.eps {
                neighbors[i].push(j);
                neighbors[j].push(i);
            }
        }
    }
    let is_core: Vec<bool> = neighbors
        .iter()
        .map(|adjacent| adjacent.len() >= params.min_neighbors)
        .collect();

    let mut labels: Vec<Option<usize>> = vec![None; count];
    let mut next_label = 0;
    for start in 0..count {
        if labels[start].is_some() || !is_core[start] {
            continue;
        }
        labels[start] = Some(next_label);
        let mut frontier = vec![start];
        while let Some(point) = frontier.pop() {
            for &neighbor in &neighbors[point] {
                if labels[neighbor].is_none() {
                    labels[neighbor] = Some(next_label);
                    if is_core[neighbor] {
                        frontier.push(neighbor);
                    }
                }
            }
        }
        next_label += 1;
    }
    labels
}

fn group_by_label(items: &[ContentItem], labels: &[Option<usize>]) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut positions: HashMap<usize, usize> = HashMap::new();

    for (index, (item, label)) in items.iter().zip(labels).enumerate() {
        match label {
            Some(label) => {
                if let Some(&position) = positions.get(label) {
                    clusters[position].members.push(item.clone());
                } else {
                    positions.insert(*label, clusters.len());
                    clusters.push(Cluster {
                        label: format!("cluster_{label}"),
                        members: vec![item.clone()],
                        degraded: false,
                    });
                }
            }
            None => clusters.push(Cluster {
                label: format!("unique_{index}"),
                members: vec![item.clone()],
                degraded: true,
            }),
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{ItemMetadata, Source};
    use crate::embedding::{EmbeddingLoader, EmbeddingModel};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn item(text: &str) -> ContentItem {
        ContentItem {
            text: text.to_string(),
            source: Source::Twitter,
            metadata: ItemMetadata::Twitter {
                likes: 0,
                retweets: 0,
                replies: 0,
            },
        }
    }

    struct TableModel {
        vectors: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingModel for TableModel {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(self.vectors.clone())
        }
    }

    struct TableLoader {
        vectors: Option<Vec<Vec<f32>>>,
    }

    #[async_trait]
    impl EmbeddingLoader for TableLoader {
        fn model_name(&self) -> &str {
            "table"
        }

        async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
            match &self.vectors {
                Some(vectors) => Ok(Arc::new(TableModel {
                    vectors: vectors.clone(),
                })),
                None => Err(EmbeddingError::Unavailable("offline".into())),
            }
        }
    }

    fn engine(vectors: Option<Vec<Vec<f32>>>) -> ClusterEngine {
        ClusterEngine::new(EmbeddingProvider::new(TableLoader { vectors }))
    }

    fn assert_covers(clusters: &[Cluster], items: &[ContentItem]) {
        let total: usize = clusters.iter().map(|cluster| cluster.members.len()).sum();
        assert_eq!(total, items.len());
        let labels: HashSet<_> = clusters.iter().map(|cluster| cluster.label.as_str()).collect();
        assert_eq!(labels.len(), clusters.len(), "labels must be unique");
        for item in items {
            let owners = clusters
                .iter()
                .filter(|cluster| cluster.members.contains(item))
                .count();
            assert_eq!(owners, 1, "{} must belong to exactly one cluster", item.text);
        }
    }

    #[tokio::test]
    async fn empty_input_yields_no_clusters() {
        let outcome = engine(None).cluster(&[]).await;
        assert_eq!(outcome, ClusterOutcome::Clustered(Vec::new()));
    }

    #[tokio::test]
    async fn unavailable_embeddings_degrade_to_singletons() {
        let items = vec![item("a"), item("b"), item("c")];
        let outcome = engine(None).cluster(&items).await;

        assert!(outcome.is_degraded());
        let clusters = outcome.clusters();
        assert_eq!(clusters.len(), items.len());
        assert!(clusters.iter().all(|cluster| cluster.degraded && cluster.members.len() == 1));
        assert_covers(clusters, &items);
    }

    #[tokio::test]
    async fn near_duplicates_form_one_cluster_and_outliers_stay_single() {
        let items = vec![
            item("dup one"),
            item("other"),
            item("dup two"),
            item("dup three"),
            item("unrelated"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.98, 0.05, 0.0],
            vec![0.97, 0.0, 0.06],
            vec![0.0, 0.0, 1.0],
        ];
        let outcome = engine(Some(vectors)).cluster(&items).await;

        assert!(!outcome.is_degraded());
        let clusters = outcome.clusters();
        assert_covers(clusters, &items);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].label, "cluster_0");
        assert!(!clusters[0].degraded);
        let texts: Vec<_> = clusters[0].members.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["dup one", "dup two", "dup three"]);
        assert_eq!(clusters[1].label, "unique_1");
        assert!(clusters[1].degraded);
        assert_eq!(clusters[2].label, "unique_4");
    }

    #[tokio::test]
    async fn mismatched_embeddings_fall_back() {
        let items = vec![item("a"), item("b")];
        let outcome = engine(Some(vec![vec![1.0, 0.0]])).cluster(&items).await;
        assert!(matches!(outcome, ClusterOutcome::Degraded { ref reason, .. } if reason.contains("expected 2")));
        assert_covers(outcome.clusters(), &items);
    }

    #[tokio::test]
    async fn non_finite_embeddings_fall_back() {
        let items = vec![item("a"), item("b")];
        let outcome = engine(Some(vec![vec![1.0, 0.0], vec![f32::NAN, 0.0]]))
            .cluster(&items)
            .await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.clusters().len(), 2);
    }

    #[test]
    fn a_lone_pair_is_noise() {
        let labels = dbscan(
            &[vec![1.0, 0.0], vec![0.99, 0.01], vec![0.0, 1.0]],
            DbscanParams::default(),
        );
        assert_eq!(labels, vec![None, None, None]);
    }

    #[test]
    fn border_points_join_the_reaching_cluster() {
        // 0..=2 are mutually close; 3 is within eps of 2 only.
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.9962, 0.0872],
            vec![0.9848, 0.1736],
            vec![0.5, 0.866],
        ];
        assert!(cosine_distance(&vectors[2], &vectors[3]) <= DEFAULT_EPS);
        assert!(cosine_distance(&vectors[1], &vectors[3]) > DEFAULT_EPS);
        assert!(cosine_distance(&vectors[0], &vectors[3]) > DEFAULT_EPS);
        let labels = dbscan(&vectors, DbscanParams::default());
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn cosine_distance_handles_zero_vectors() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
    }
}
