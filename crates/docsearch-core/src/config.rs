//! docsearch Configuration Management
//!
//! Handles configuration from environment variables and TOML files,
//! with defaults matching a local Qdrant + Ollama development setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{CollectionSpec, Distance};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Vector index connection and collection
    pub vector: VectorConfig,

    /// Embedding model
    pub embedding: EmbeddingConfig,

    /// Speech-to-text engine
    pub speech: SpeechConfig,

    /// Query defaults
    pub query: QueryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Load from an optional file, then apply the environment and validate
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?.with_env_override()?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Qdrant
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.vector.qdrant_url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
            self.vector.collection = collection;
        }
        if let Ok(dimension) = std::env::var("VECTOR_DIMENSION") {
            self.vector.vector_dimension = parse_env("VECTOR_DIMENSION", dimension)?;
        }
        if let Ok(policy) = std::env::var("POINT_ID_POLICY") {
            self.vector.id_policy = policy.parse()?;
        }

        // Embedding
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.embedding.ollama_url = url;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.embedding.openai_api_key = Some(key);
        }

        // Speech
        if let Ok(language) = std::env::var("SPEECH_LANGUAGE") {
            self.speech.language = language;
        }
        if let Ok(key) = std::env::var("SPEECH_API_KEY") {
            self.speech.api_key = Some(key);
        }

        // Query
        if let Ok(top_k) = std::env::var("QUERY_TOP_K") {
            self.query.top_k = parse_env("QUERY_TOP_K", top_k)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector.collection.trim().is_empty() {
            return Err(ConfigError::MissingRequired("vector.collection".to_string()));
        }
        if self.vector.vector_dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "vector.vector_dimension".to_string(),
                value: "0".to_string(),
            });
        }
        if self.query.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "query.top_k".to_string(),
                value: "0".to_string(),
            });
        }
        if self.embedding.provider == EmbeddingProvider::OpenAI
            && self.embedding.openai_api_key.is_none()
        {
            return Err(ConfigError::MissingRequired("OPENAI_API_KEY".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Collection name
    pub collection: String,

    /// Vector dimension (must match embedding model)
    pub vector_dimension: usize,

    /// Similarity metric
    pub distance: Distance,

    /// How point identifiers are assigned on each indexing call
    pub id_policy: PointIdPolicy,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "documents".to_string(),
            vector_dimension: 384, // all-MiniLM-L6-v2
            distance: Distance::Cosine,
            id_policy: PointIdPolicy::Sequential,
        }
    }
}

impl VectorConfig {
    /// Collection described by this configuration
    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec::new(&self.collection, self.vector_dimension).with_distance(self.distance)
    }
}

/// Identifier assignment for indexed points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointIdPolicy {
    /// `0..n-1` on every call; a later call overwrites earlier points by position
    #[default]
    Sequential,
    /// UUIDv5 of source and page; stable across calls
    ContentDerived,
}

impl std::str::FromStr for PointIdPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(Self::Sequential),
            "content_derived" | "content" => Ok(Self::ContentDerived),
            _ => Err(ConfigError::InvalidValue {
                key: "POINT_ID_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider to use
    pub provider: EmbeddingProvider,

    /// Embedding model name
    pub model: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub openai_base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Ollama,
            model: "all-minilm".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            openai_api_key: None,
            openai_base_url: None,
            timeout_secs: 60,
        }
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    OpenAI,
    Ollama,
    /// In-process feature hashing, no model server
    Hashing,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 locale passed to the recognizer
    pub language: String,

    /// Google Cloud API key
    pub api_key: Option<String>,

    /// Recognize endpoint
    pub endpoint: String,

    /// Sample rate for compressed formats (MP3, OGG/Opus)
    pub sample_rate_hertz: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "pt-BR".to_string(),
            api_key: None,
            endpoint: "https://speech.googleapis.com/v1p1beta1/speech:recognize".to_string(),
            sample_rate_hertz: 48_000,
            timeout_secs: 120,
        }
    }
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of results returned per query
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
