//! Configuration handling for docrag.
//!
//! Every field has a serde default, so a missing or partial config file is
//! valid. Lookup order for the file: `--config`, then
//! `$DOCRAG_CONFIG_DIR/config.toml`, then the XDG config directory.

use directories::ProjectDirs;
use docrag_core::{ChunkConfig, DistanceMetric, Error, Result};
use docrag_query::QueryConfig as QuerySettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Largest accepted request body (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_max_upload_bytes() -> usize {
    52_428_800 // 50MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Which vector store backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map, lost on exit
    #[default]
    Memory,
    /// `LanceDB` directory on disk
    Lance,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database path (default: `<data dir>/index.lance`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Similarity metric, fixed for the lifetime of an index
    #[serde(default)]
    pub metric: DistanceMetric,
}

/// Embedding model choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingModel {
    /// Feature-hashing embedder, no download
    #[default]
    Hashing,
    /// `all-MiniLM-L6-v2` through candle (requires the `candle` feature)
    Minilm,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to use
    #[serde(default)]
    pub model: EmbeddingModel,

    /// Vector width
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// L2-normalize vectors
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Max concurrent embedding jobs
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_normalize() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::default(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            normalize: default_normalize(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Chunking-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length (characters)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_overlap() -> usize {
    50
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

/// Query-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default result limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Maximum result limit
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    docrag_core::DEFAULT_SEARCH_LIMIT
}

fn default_max_limit() -> usize {
    docrag_query::DEFAULT_MAX_LIMIT
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when neither `--verbose` nor `RUST_LOG` is set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// defaults. Environment overrides are applied and the result is
    /// validated.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(&path)?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file.
    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }

    /// Parse TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var("DOCRAG_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|e| Error::Config(format!("DOCRAG_BIND={bind}: {e}")))?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.chunk_config()?;

        if self.embedding.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be greater than 0".to_string()));
        }
        if self.embedding.model == EmbeddingModel::Minilm && self.embedding.dimension != 384 {
            return Err(Error::Config(format!(
                "embedding.model = \"minilm\" produces 384-dimensional vectors, not {}",
                self.embedding.dimension
            )));
        }
        if self.query.default_limit == 0 {
            return Err(Error::Config("query.default_limit must be at least 1".to_string()));
        }
        if self.query.max_limit < self.query.default_limit {
            return Err(Error::Config(format!(
                "query.max_limit ({}) is below query.default_limit ({})",
                self.query.max_limit, self.query.default_limit
            )));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(Error::Config("server.max_upload_bytes must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Chunking parameters as the chunker consumes them.
    pub fn chunk_config(&self) -> Result<ChunkConfig> {
        Ok(ChunkConfig::new(self.chunking.chunk_size, self.chunking.overlap)?)
    }

    /// Embedding parameters as the embedders consume them.
    pub fn embed_config(&self) -> docrag_core::EmbeddingConfig {
        docrag_core::EmbeddingConfig {
            normalize: self.embedding.normalize,
            batch_size: self.embedding.batch_size,
        }
    }

    /// Query parameters as the query pipeline consumes them.
    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            default_limit: self.query.default_limit,
            max_limit: self.query.max_limit,
            embed_config: self.embed_config(),
        }
    }

    /// Resolved database path.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .path
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("index.lance")))
    }

    /// Default config file location.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Commented sample configuration.
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }
}

const SAMPLE_TOML: &str = r#"# docrag configuration

[server]
bind = "127.0.0.1:8000"
max_upload_bytes = 52428800

[store]
# "memory" keeps chunks in process; "lance" persists them with LanceDB.
backend = "memory"
# path = "/var/lib/docrag/index.lance"
# "cosine" | "l2" | "dot". Changing it requires re-ingesting.
metric = "cosine"

[embedding]
# "hashing" needs no download; "minilm" uses all-MiniLM-L6-v2.
model = "hashing"
dimension = 384
batch_size = 32
normalize = true
max_concurrent = 4

[chunking]
chunk_size = 500
overlap = 50

[query]
default_limit = 5
max_limit = 50

[logging]
level = "info"
"#;

/// Get the XDG data directory for docrag.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCRAG_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docrag").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the XDG config directory for docrag.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCRAG_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docrag").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the XDG cache directory for docrag.
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "docrag").map(|dirs| dirs.cache_dir().to_path_buf())
}
