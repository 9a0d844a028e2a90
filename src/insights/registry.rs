//! Listing of text-generation models installed in the Ollama runtime.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const EXCLUDED_MARKERS: [&str; 2] = ["embed", "mini"];

/// Coarse size bucket used by clients to pick a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    /// More than 8 GiB on disk.
    Large,
    /// More than 4 GiB on disk.
    Medium,
    /// Everything else.
    Small,
}

impl ModelCategory {
    /// Bucket a model by its size in bytes.
    pub fn from_size(bytes: u64) -> Self {
        let gib = bytes as f64 / GIB;
        if gib > 8.0 {
            Self::Large
        } else if gib > 4.0 {
            Self::Medium
        } else {
            Self::Small
        }
    }
}

/// One installed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model tag, e.g. `qwen2.5:14b`.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Size in GiB rounded to one decimal.
    pub size_gb: f64,
    /// Size bucket.
    pub category: ModelCategory,
    /// Last modification timestamp as reported by Ollama.
    pub modified: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_at: String,
}

/// Client for Ollama's `GET /api/tags`.
#[derive(Clone)]
pub struct ModelRegistry {
    http: Client,
    base_url: String,
}

impl ModelRegistry {
    /// Build a registry client for `base_url`.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("trend-lens/registry")
            .timeout(REGISTRY_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Installed generation models, largest first.
    ///
    /// Embedding and "mini" models are excluded. Any transport or decoding failure yields an
    /// empty list.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        match self.fetch_tags().await {
            Ok(tags) => {
                let models = catalog(tags);
                tracing::debug!(count = models.len(), "Listed generation models");
                models
            }
            Err(error) => {
                tracing::warn!(base_url = %self.base_url, error = %error, "Failed to list Ollama models");
                Vec::new()
            }
        }
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, reqwest::Error> {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn catalog(tags: TagsResponse) -> Vec<ModelInfo> {
    let mut models: Vec<ModelInfo> = tags
        .models
        .into_iter()
        .filter(|entry| {
            let name = entry.name.to_lowercase();
            !EXCLUDED_MARKERS.iter().any(|marker| name.contains(marker))
        })
        .map(|entry| ModelInfo {
            size_gb: (entry.size as f64 / GIB * 10.0).round() / 10.0,
            category: ModelCategory::from_size(entry.size),
            name: entry.name,
            size: entry.size,
            modified: entry.modified_at,
        })
        .collect();
    models.sort_by(|left, right| right.size.cmp(&left.size));
    models
}
