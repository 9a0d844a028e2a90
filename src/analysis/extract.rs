//! Normalization of scraped batch documents into [`ContentItem`] sequences.
//!
//! Two layouts are recognized. Aggregated batches group sections under `by_source`; single-source
//! files carry a `source` discriminator with posts under `data` (Reddit) or `tweets` (Twitter).
//! The layout is resolved once into [`BatchDocument`]; extraction then runs the typed function for
//! each section without further field sniffing.

use super::types::{ContentItem, ItemMetadata, Source};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while interpreting a batch document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document root was not a JSON object.
    #[error("batch document must be a JSON object")]
    NotAnObject,
    /// A recognized section did not match its expected layout.
    #[error("malformed {section} section: {source}")]
    MalformedSection {
        /// Section that failed to deserialize.
        section: &'static str,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Reddit submission as written by the scraper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditPost {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    num_comments: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

/// Tweet as written by the scraper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    retweet_count: Option<i64>,
    #[serde(default)]
    reply_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Section<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Multi-source batch written by the scraper manager.
#[derive(Debug, Default, Deserialize)]
pub struct AggregatedBatch {
    #[serde(default)]
    reddit: Option<Section<RedditPost>>,
    #[serde(default)]
    twitter: Option<Section<Tweet>>,
}

/// Output of a single scraper run.
#[derive(Debug)]
pub enum SingleSourceBatch {
    /// Reddit posts listed under `data`.
    Reddit(Vec<RedditPost>),
    /// Tweets listed under `tweets`.
    Twitter(Vec<Tweet>),
    /// Source name without a known layout; yields no items.
    Unrecognized(String),
}

/// Batch document with its layout resolved.
#[derive(Debug)]
pub enum BatchDocument {
    /// Sections keyed by source name under `by_source`.
    Aggregated(AggregatedBatch),
    /// A flat list under a source-specific key.
    SingleSource(SingleSourceBatch),
}

impl BatchDocument {
    /// Resolve the layout of a raw JSON document.
    pub fn from_value(value: Value) -> Result<Self, ExtractError> {
        let Value::Object(mut root) = value else {
            return Err(ExtractError::NotAnObject);
        };

        if let Some(by_source) = root.remove("by_source") {
            let batch = if by_source.is_null() {
                AggregatedBatch::default()
            } else {
                parse_section("by_source", by_source)?
            };
            return Ok(Self::Aggregated(batch));
        }

        let source = root
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let batch = match source.as_str() {
            "reddit" => SingleSourceBatch::Reddit(parse_list(&mut root, "data")?),
            "twitter" => SingleSourceBatch::Twitter(parse_list(&mut root, "tweets")?),
            _ => SingleSourceBatch::Unrecognized(source),
        };
        Ok(Self::SingleSource(batch))
    }

    /// Flatten the document into content items in a deterministic order.
    pub fn into_items(self) -> Vec<ContentItem> {
        match self {
            Self::Aggregated(batch) => {
                let mut items = batch
                    .reddit
                    .map(|section| extract_reddit(section.data))
                    .unwrap_or_default();
                if let Some(section) = batch.twitter {
                    items.extend(extract_twitter(section.data));
                }
                items
            }
            Self::SingleSource(SingleSourceBatch::Reddit(posts)) => extract_reddit(posts),
            Self::SingleSource(SingleSourceBatch::Twitter(tweets)) => extract_twitter(tweets),
            Self::SingleSource(SingleSourceBatch::Unrecognized(source)) => {
                tracing::debug!(source = %source, "Skipping batch with unrecognized source");
                Vec::new()
            }
        }
    }
}

/// Parse and flatten a raw batch document in one step.
pub fn extract_text_content(value: Value) -> Result<Vec<ContentItem>, ExtractError> {
    BatchDocument::from_value(value).map(BatchDocument::into_items)
}

fn parse_section<T>(section: &'static str, value: Value) -> Result<T, ExtractError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|source| ExtractError::MalformedSection { section, source })
}

fn parse_list<T>(
    root: &mut serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Vec<T>, ExtractError>
where
    T: for<'de> Deserialize<'de>,
{
    match root.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => parse_section(key, value),
    }
}

fn extract_reddit(posts: Vec<RedditPost>) -> Vec<ContentItem> {
    posts
        .into_iter()
        .filter_map(|post| {
            let title = post.title.unwrap_or_default();
            let text = match post.selftext.as_deref() {
                Some(body) if !body.is_empty() => format!("{title} {body}"),
                _ => title,
            };
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(ContentItem {
                text: text.to_string(),
                source: Source::Reddit,
                metadata: ItemMetadata::Reddit {
                    subreddit: post.subreddit.unwrap_or_default(),
                    score: post.score.unwrap_or(0),
                    num_comments: post.num_comments.unwrap_or(0),
                    url: post.url.unwrap_or_default(),
                },
            })
        })
        .collect()
}

fn extract_twitter(tweets: Vec<Tweet>) -> Vec<ContentItem> {
    tweets
        .into_iter()
        .filter_map(|tweet| {
            let text = tweet.text.as_deref().map(str::trim).unwrap_or("");
            if text.is_empty() {
                return None;
            }
            let metrics = tweet.public_metrics.unwrap_or_default();
            Some(ContentItem {
                text: text.to_string(),
                source: Source::Twitter,
                metadata: ItemMetadata::Twitter {
                    likes: metrics.like_count.unwrap_or(0),
                    retweets: metrics.retweet_count.unwrap_or(0),
                    replies: metrics.reply_count.unwrap_or(0),
                },
            })
        })
        .collect()
}
