//! Prompt rendering for insight generation.

use crate::analysis::ClusterSummary;
use std::fmt::Write as _;

/// Only the largest clusters are sent to keep the prompt bounded.
pub const MAX_PROMPT_CLUSTERS: usize = 8;

const PREAMBLE: &str = "You are analyzing clustered social media discussions to identify product opportunities.

IMPORTANT: Respond with valid JSON only, no explanation text.

Clusters of similar discussions (ordered by frequency):
";

const INSTRUCTIONS: &str = r#"
Analyze these patterns and return JSON:
{
  "opportunities": [
    {
      "title": "Clear product opportunity description",
      "confidence": 0.85,
      "evidence": "Specific evidence from the clusters",
      "cluster_refs": [1, 2],
      "sources": ["reddit", "twitter"]
    }
  ],
  "trends": [
    {
      "topic": "Trending topic name",
      "momentum": "rising",
      "mentions": 15
    }
  ],
  "pain_points": [
    {
      "issue": "User frustration or problem",
      "frequency": "high"
    }
  ]
}

Focus on actionable opportunities and clear trends. Confidence must be between 0 and 1 and reflect how strong the evidence is."#;

/// Render the insight prompt for the leading summaries.
pub fn build_insight_prompt(summaries: &[ClusterSummary]) -> String {
    let mut prompt = String::from(PREAMBLE);

    for (index, summary) in summaries.iter().take(MAX_PROMPT_CLUSTERS).enumerate() {
        let sources = summary
            .sources
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            prompt,
            "\nCLUSTER {} ({} similar posts from {}):",
            index + 1,
            summary.size,
            sources
        );
        for text in &summary.representative_texts {
            let _ = writeln!(prompt, "- {text}");
        }
    }

    prompt.push_str(INSTRUCTIONS);
    prompt
}
