//! Engagement ranking and per-cluster aggregation.

use super::types::{Cluster, ClusterSummary, ContentItem, ItemMetadata, Source};
use std::collections::BTreeSet;

/// Maximum number of excerpts kept per cluster.
pub const MAX_REPRESENTATIVES: usize = 3;
/// Excerpts longer than this many characters are truncated.
pub const EXCERPT_CHAR_LIMIT: usize = 200;
const TRUNCATION_MARKER: &str = "...";

/// Source-specific engagement score used to rank cluster members.
///
/// Reddit: `score + num_comments`. Twitter: `likes + 2 × retweets + 3 × replies`.
pub fn engagement_score(item: &ContentItem) -> i64 {
    match &item.metadata {
        ItemMetadata::Reddit {
            score,
            num_comments,
            ..
        } => score + num_comments,
        ItemMetadata::Twitter {
            likes,
            retweets,
            replies,
        } => likes + retweets * 2 + replies * 3,
    }
}

/// Summarize every meaningful cluster, largest first.
///
/// Degraded clusters and singletons are skipped, so a fully degraded partition yields no
/// summaries. Equal-size clusters keep their input order.
pub fn summarize_clusters(clusters: &[Cluster]) -> Vec<ClusterSummary> {
    let mut summaries: Vec<ClusterSummary> = clusters
        .iter()
        .filter(|cluster| !cluster.degraded && cluster.members.len() > 1)
        .map(summarize_cluster)
        .collect();

    let skipped = clusters.len() - summaries.len();
    if skipped > 0 {
        tracing::debug!(skipped, kept = summaries.len(), "Skipped singleton clusters");
    }

    summaries.sort_by(|left, right| right.size.cmp(&left.size));
    summaries
}

fn summarize_cluster(cluster: &Cluster) -> ClusterSummary {
    let mut ranked: Vec<(i64, &ContentItem)> = cluster
        .members
        .iter()
        .map(|item| (engagement_score(item), item))
        .collect();
    // Stable sort keeps extraction order among equal scores.
    ranked.sort_by(|left, right| right.0.cmp(&left.0));

    let representative_texts = ranked
        .iter()
        .take(MAX_REPRESENTATIVES)
        .map(|(_, item)| excerpt(&item.text))
        .collect();
    let sources: BTreeSet<Source> = cluster.members.iter().map(|item| item.source).collect();
    let total_engagement = ranked.iter().map(|(score, _)| score).sum();

    ClusterSummary {
        cluster_id: cluster.label.clone(),
        size: cluster.members.len(),
        representative_texts,
        sources: sources.into_iter().collect(),
        total_engagement,
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHAR_LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(EXCERPT_CHAR_LIMIT).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reddit(text: &str, score: i64, num_comments: i64) -> ContentItem {
        ContentItem {
            text: text.to_string(),
            source: Source::Reddit,
            metadata: ItemMetadata::Reddit {
                subreddit: "startups".into(),
                score,
                num_comments,
                url: String::new(),
            },
        }
    }

    fn tweet(text: &str, likes: i64, retweets: i64, replies: i64) -> ContentItem {
        ContentItem {
            text: text.to_string(),
            source: Source::Twitter,
            metadata: ItemMetadata::Twitter {
                likes,
                retweets,
                replies,
            },
        }
    }

    fn cluster(label: &str, members: Vec<ContentItem>) -> Cluster {
        Cluster {
            label: label.to_string(),
            members,
            degraded: false,
        }
    }

    #[test]
    fn engagement_uses_source_specific_weights() {
        assert_eq!(engagement_score(&reddit("r", 10, 5)), 15);
        assert_eq!(engagement_score(&tweet("t", 4, 3, 2)), 4 + 6 + 6);
    }

    #[test]
    fn representatives_follow_engagement_with_stable_ties() {
        let members = vec![
            reddit("low", 1, 0),
            reddit("tie first", 5, 0),
            tweet("top", 10, 0, 0),
            reddit("tie second", 3, 2),
            reddit("tie third", 4, 1),
        ];
        let expected_total: i64 = members.iter().map(engagement_score).sum();
        let summaries = summarize_clusters(&[cluster("cluster_0", members)]);

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.size, 5);
        assert_eq!(
            summary.representative_texts,
            vec!["top", "tie first", "tie second"]
        );
        assert_eq!(summary.total_engagement, expected_total);
        assert_eq!(summary.sources, vec![Source::Reddit, Source::Twitter]);
    }

    #[test]
    fn representatives_are_capped_at_cluster_size() {
        let summaries = summarize_clusters(&[cluster(
            "cluster_0",
            vec![reddit("a", 1, 0), reddit("b", 2, 0)],
        )]);
        assert_eq!(summaries[0].representative_texts.len(), 2);
    }

    #[test]
    fn long_excerpts_are_truncated_with_marker() {
        let long = "é".repeat(250);
        let summaries = summarize_clusters(&[cluster(
            "cluster_0",
            vec![reddit(&long, 2, 0), reddit("short", 1, 0)],
        )]);
        let first = &summaries[0].representative_texts[0];
        assert_eq!(first.chars().count(), EXCERPT_CHAR_LIMIT + TRUNCATION_MARKER.len());
        assert!(first.ends_with("..."));
        assert_eq!(summaries[0].representative_texts[1], "short");
    }

    #[test]
    fn degraded_and_singleton_clusters_are_skipped() {
        let clusters = vec![
            Cluster {
                label: "unique_0".into(),
                members: vec![reddit("noise", 100, 0)],
                degraded: true,
            },
            cluster("cluster_0", vec![reddit("solo", 1, 0)]),
            cluster("cluster_1", vec![reddit("a", 1, 0), reddit("b", 1, 0)]),
        ];
        let summaries = summarize_clusters(&clusters);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].cluster_id, "cluster_1");
    }

    #[test]
    fn summaries_sort_by_size_and_keep_input_order_on_ties() {
        let clusters = vec![
            cluster("cluster_0", vec![reddit("a", 0, 0), reddit("b", 0, 0)]),
            cluster(
                "cluster_1",
                vec![reddit("c", 0, 0), reddit("d", 0, 0), reddit("e", 0, 0)],
            ),
            cluster("cluster_2", vec![reddit("f", 0, 0), reddit("g", 0, 0)]),
        ];
        let ids: Vec<_> = summarize_clusters(&clusters)
            .into_iter()
            .map(|summary| summary.cluster_id)
            .collect();
        assert_eq!(ids, vec!["cluster_1", "cluster_0", "cluster_2"]);
    }
}
