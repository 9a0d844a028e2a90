//! File-backed storage for batch documents and analysis results.

use crate::analysis::AnalysisResult;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ANALYSIS_SUFFIX: &str = "_analysis.json";
const JSON_EXTENSION: &str = ".json";

/// Errors raised while reading or writing stored artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),
    /// The name would resolve outside the data directory.
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file content is not valid JSON for the expected shape.
    #[error("Invalid JSON in {name}: {source}")]
    Json {
        /// File name being decoded or encoded.
        name: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Name of the analysis document derived from a batch name.
///
/// `reddit_batch.json` becomes `reddit_batch_analysis.json`; names without a `.json` extension get
/// the suffix appended as-is.
pub fn analysis_file_name(batch_name: &str) -> String {
    let stem = batch_name
        .strip_suffix(JSON_EXTENSION)
        .unwrap_or(batch_name);
    format!("{stem}{ANALYSIS_SUFFIX}")
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let escapes = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || Path::new(name).is_absolute();
    if escapes {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Batch and analysis documents stored as flat files under one directory.
#[derive(Debug, Clone)]
pub struct BatchStore {
    root: PathBuf,
}

impl BatchStore {
    /// Store rooted at `root`. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    async fn read_json(&self, name: &str) -> Result<Value, StoreError> {
        let path = self.resolve(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            name: name.to_string(),
            source,
        })
    }

    /// Read a batch document as untyped JSON.
    pub async fn load_batch(&self, name: &str) -> Result<Value, StoreError> {
        let value = self.read_json(name).await?;
        tracing::debug!(batch = name, "Loaded batch document");
        Ok(value)
    }

    /// Persist `result` next to its batch and return the analysis file name.
    pub async fn save_analysis(
        &self,
        batch_name: &str,
        result: &AnalysisResult,
    ) -> Result<String, StoreError> {
        let file_name = analysis_file_name(batch_name);
        let path = self.resolve(&file_name)?;
        let body = serde_json::to_vec_pretty(result).map_err(|source| StoreError::Json {
            name: file_name.clone(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| StoreError::Io { path, source })?;

        tracing::info!(file = %file_name, "Saved analysis");
        Ok(file_name)
    }

    /// Read a previously persisted analysis document.
    pub async fn load_analysis(&self, name: &str) -> Result<AnalysisResult, StoreError> {
        let value = self.read_json(name).await?;
        serde_json::from_value(value).map_err(|source| StoreError::Json {
            name: name.to_string(),
            source,
        })
    }
}
