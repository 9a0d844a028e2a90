use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
const DEFAULT_ANALYSIS_MODEL: &str = "qwen2.5:14b";
const DEFAULT_INSIGHT_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Trend Lens analyzer.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding scraped batch files and persisted analyses.
    pub data_dir: PathBuf,
    /// Base URL of the Ollama runtime used for embeddings and insight generation.
    pub ollama_url: String,
    /// Backend used to produce semantic embeddings.
    pub embedding_provider: EmbeddingBackend,
    /// Embedding model identifier passed to the backend.
    pub embedding_model: String,
    /// Vector size produced by the local hashing backend.
    pub embedding_dimension: usize,
    /// Text-generation model used when a caller does not name one.
    pub analysis_model: String,
    /// Upper bound for a single insight-generation request, in seconds.
    pub insight_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the clustering stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Model served by a local Ollama runtime.
    Ollama,
    /// Deterministic in-process feature hashing.
    Hashing,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            data_dir: load_env_optional("DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            embedding_provider: load_env_optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(EmbeddingBackend::Ollama),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_optional("EMBEDDING_DIMENSION")?
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            analysis_model: load_env_optional("ANALYSIS_MODEL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            insight_timeout_secs: parse_optional("INSIGHT_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_INSIGHT_TIMEOUT_SECS),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.into(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_provider: EmbeddingBackend::Ollama,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            insight_timeout_secs: DEFAULT_INSIGHT_TIMEOUT_SECS,
            server_port: None,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" | "hash" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        ollama_url = %config.ollama_url,
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        analysis_model = %config.analysis_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_backend_parses_case_insensitively() {
        assert_eq!("Ollama".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Ollama));
        assert_eq!(" hashing ".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Hashing));
        assert!("openai".parse::<EmbeddingBackend>().is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.insight_timeout_secs, 120);
        assert_eq!(config.analysis_model, "qwen2.5:14b");
        assert!(config.server_port.is_none());
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let error = ConfigError::InvalidValue("SERVER_PORT".into());
        assert_eq!(
            error.to_string(),
            "Invalid value for environment variable: SERVER_PORT"
        );
    }
}
