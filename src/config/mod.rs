//! Configuration management for archivist
//!
//! Handles loading and validating configuration from TOML files. Endpoint
//! URLs may be overridden by environment variables; API keys are never stored
//! in the file, only the names of the environment variables that hold them.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Environment variable name for Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub qdrant_api_key_env: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Synchronizer configuration
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Environment variable name for the service API key
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model and collection)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Maximum texts per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Retries per batch before the batch is skipped
    #[serde(default = "default_embedding_max_retries")]
    pub max_retries: usize,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target characters per chunk (soft limit, a single long sentence may exceed it)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters of the closed chunk carried into the next chunk
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results
    #[serde(default = "default_query_k")]
    pub default_k: usize,

    /// Maximum results allowed
    #[serde(default = "default_query_max_results")]
    pub max_results: usize,
}

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Purge index records for documents no longer present in the corpus
    #[serde(default = "default_prune_removed")]
    pub prune_removed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            qdrant_api_key_env: default_qdrant_api_key_env(),
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            query: QueryConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            api_key_env: default_embedding_api_key_env(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_max_retries(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_query_k(),
            max_results: default_query_max_results(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            prune_removed: default_prune_removed(),
        }
    }
}

impl Config {
    /// Get the default config file path (~/.config/archivist/config.toml)
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("archivist")
            .join("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, falling back to defaults
    /// when no file exists
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No config file found, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Get the Qdrant API key from environment
    pub fn qdrant_api_key(&self) -> Option<String> {
        std::env::var(&self.qdrant_api_key_env).ok()
    }

    /// Get the embedding service API key from environment
    pub fn embedding_api_key(&self) -> Result<String> {
        std::env::var(&self.embedding.api_key_env).map_err(|_| {
            Error::Config(format!(
                "Embedding API key not set; export {} before running",
                self.embedding.api_key_env
            ))
        })
    }

    /// Validate configuration. Violations here are fatal and abort before
    /// any corpus work begins.
    pub fn validate(&self) -> Result<()> {
        if self.chunk.chunk_size == 0 {
            return Err(Error::Config("chunk.chunk_size must be positive".to_string()));
        }

        if self.chunk.overlap >= self.chunk.chunk_size {
            return Err(Error::Config(
                "chunk.overlap must be < chunk.chunk_size".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        if self.query.default_k == 0 || self.query.default_k > self.query.max_results {
            return Err(Error::Config(
                "query.default_k must be between 1 and query.max_results".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.collection_name, "archivist_docs");
        assert_eq!(config.chunk.chunk_size, 512);
        assert_eq!(config.chunk.overlap, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config::default();
        config.chunk.overlap = config.chunk.chunk_size;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = Config::default();
        config.embedding.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.collection_name = "test_collection".to_string();
        config.chunk.chunk_size = 256;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.collection_name, "test_collection");
        assert_eq!(loaded.chunk.chunk_size, 256);
        assert_eq!(loaded.chunk.overlap, 50);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "collection_name = \"partial\"\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.collection_name, "partial");
        assert_eq!(loaded.embedding.batch_size, 96);
        assert!(loaded.sync.prune_removed);
    }
}
