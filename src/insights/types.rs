//! Insight records returned by the language model.
//!
//! Entries are decoded leniently: a `null` or wrongly typed field falls back to its default
//! instead of discarding the whole answer. Only the top-level shape is strict.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::InsightError;

/// A product opportunity backed by cluster evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Short description of the opportunity.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// Model confidence in `[0, 1]`.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: f64,
    /// Evidence quoted from the clusters.
    #[serde(default, deserialize_with = "lenient_string")]
    pub evidence: String,
    /// One-based indices of the prompt clusters supporting the opportunity.
    #[serde(default, deserialize_with = "lenient_cluster_refs")]
    pub cluster_refs: Vec<u32>,
    /// Sources the evidence came from.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub sources: Vec<String>,
}

/// A topic gaining or losing attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    /// Topic name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: String,
    /// Direction reported by the model, e.g. `rising`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub momentum: String,
    /// Approximate mention count.
    #[serde(default, deserialize_with = "lenient_count")]
    pub mentions: u64,
}

/// A recurring user frustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainPoint {
    /// Description of the problem.
    #[serde(default, deserialize_with = "lenient_string")]
    pub issue: String,
    /// Frequency label reported by the model, e.g. `high`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn count_from(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite() && *float >= 0.0)
                .map(|float| float.round() as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(count_from(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_cluster_refs<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .iter()
            .filter(|value| value.is_number())
            .filter_map(count_from)
            .filter_map(|index| u32::try_from(index).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(refs)
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let strings = match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        Value::String(text) => vec![text],
        _ => Vec::new(),
    };
    Ok(strings)
}

/// Structured insights for one analysis run.
///
/// `error` is set only when generation fell back to the empty structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Product opportunities.
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    /// Trending topics.
    #[serde(default)]
    pub trends: Vec<Trend>,
    /// Pain points.
    #[serde(default)]
    pub pain_points: Vec<PainPoint>,
    /// Why generation fell back to empty insights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Insights {
    /// Empty insights carrying a failure description.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Whether no records of any kind are present.
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty() && self.trends.is_empty() && self.pain_points.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct InsightPayload {
    #[serde(default)]
    opportunities: Vec<Opportunity>,
    #[serde(default)]
    trends: Vec<Trend>,
    #[serde(default)]
    pain_points: Vec<PainPoint>,
}

/// Parse the model's JSON answer into [`Insights`].
///
/// The root must be an object and each present list must be an array of objects; anything else is
/// a [`InsightError::MalformedResponse`]. Missing keys become empty lists, odd entry fields fall
/// back to defaults, and confidences are clamped into `[0, 1]`.
pub fn parse_insights(raw: &str) -> Result<Insights, InsightError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|error| InsightError::MalformedResponse(error.to_string()))?;
    if !value.is_object() {
        return Err(InsightError::MalformedResponse(
            "expected a JSON object at the top level".into(),
        ));
    }

    let payload: InsightPayload = serde_json::from_value(value)
        .map_err(|error| InsightError::MalformedResponse(error.to_string()))?;

    let opportunities = payload
        .opportunities
        .into_iter()
        .map(|mut opportunity| {
            opportunity.confidence = opportunity.confidence.clamp(0.0, 1.0);
            opportunity
        })
        .collect();

    Ok(Insights {
        opportunities,
        trends: payload.trends,
        pain_points: payload.pain_points,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_payload() {
        let raw = r#"{
            "opportunities": [
                { "title": "Invoicing for freelancers", "confidence": 0.85, "evidence": "3 posts", "cluster_refs": [1, 2], "sources": ["reddit"] }
            ],
            "trends": [ { "topic": "AI agents", "momentum": "rising", "mentions": 15 } ],
            "pain_points": [ { "issue": "Late payments", "frequency": "high" } ]
        }"#;

        let insights = parse_insights(raw).expect("insights");
        assert_eq!(insights.opportunities.len(), 1);
        assert_eq!(insights.opportunities[0].cluster_refs, vec![1, 2]);
        assert_eq!(insights.trends[0].mentions, 15);
        assert_eq!(insights.pain_points[0].frequency, "high");
        assert!(insights.error.is_none());
    }

    #[test]
    fn missing_keys_default_and_confidence_is_clamped() {
        let insights =
            parse_insights(r#"{ "opportunities": [ { "title": "x", "confidence": 1.7 } ] }"#)
                .expect("insights");
        assert_eq!(insights.opportunities[0].confidence, 1.0);
        assert!(insights.trends.is_empty());
        assert!(insights.pain_points.is_empty());
    }

    #[test]
    fn rejects_non_json_and_non_objects() {
        assert!(matches!(
            parse_insights("Sure! Here are the insights"),
            Err(InsightError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_insights("[]"),
            Err(InsightError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_insights(r#"{ "trends": "rising" }"#),
            Err(InsightError::MalformedResponse(_))
        ));
    }

    #[test]
    fn null_fields_fall_back_to_defaults() {
        let insights = parse_insights(
            r#"{
                "opportunities": [
                    { "title": "Invoicing", "confidence": null, "evidence": null, "cluster_refs": null, "sources": null },
                    { "title": "Scheduling", "confidence": 0.6, "evidence": "2 posts" }
                ],
                "pain_points": [ { "issue": "Late payments", "frequency": null } ]
            }"#,
        )
        .expect("insights");

        assert_eq!(insights.opportunities.len(), 2);
        assert_eq!(insights.opportunities[0].evidence, "");
        assert_eq!(insights.opportunities[0].confidence, 0.0);
        assert!(insights.opportunities[0].cluster_refs.is_empty());
        assert_eq!(insights.opportunities[1].evidence, "2 posts");
        assert_eq!(insights.pain_points[0].frequency, "");
    }

    #[test]
    fn float_mentions_are_accepted() {
        let insights = parse_insights(
            r#"{ "trends": [
                { "topic": "AI agents", "momentum": "rising", "mentions": 15.0 },
                { "topic": "No-code", "momentum": "stable", "mentions": "7" },
                { "topic": "Crypto", "momentum": "falling", "mentions": -3.5 }
            ] }"#,
        )
        .expect("insights");

        let mentions: Vec<u64> = insights.trends.iter().map(|trend| trend.mentions).collect();
        assert_eq!(mentions, vec![15, 7, 0]);
    }

    #[test]
    fn non_numeric_cluster_refs_are_dropped() {
        let insights = parse_insights(
            r#"{ "opportunities": [
                { "title": "Invoicing", "confidence": 0.8, "cluster_refs": ["CLUSTER 1", 2, 3.0, -1], "sources": ["reddit", 4] }
            ] }"#,
        )
        .expect("insights");

        let opportunity = &insights.opportunities[0];
        assert_eq!(opportunity.cluster_refs, vec![2, 3]);
        assert_eq!(opportunity.sources, vec!["reddit"]);
        assert_eq!(opportunity.confidence, 0.8);
    }

    #[test]
    fn error_field_is_omitted_when_absent() {
        let json = serde_json::to_value(Insights::default()).expect("json");
        assert_eq!(
            json,
            serde_json::json!({ "opportunities": [], "trends": [], "pain_points": [] })
        );
        let failed = serde_json::to_value(Insights::failed("boom")).expect("json");
        assert_eq!(failed["error"], "boom");
    }
}
