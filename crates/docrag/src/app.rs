//! Component wiring shared by the server and the CLI.

use docrag_chunker::FixedSizeChunker;
use docrag_core::{Embedder, Error, Result, VectorStore};
use docrag_embed::{EmbedderPool, HashingEmbedder};
use docrag_extract::ExtractorRegistry;
use docrag_index::{IngestConfig, IngestPipeline};
use docrag_query::QueryPipeline;
use docrag_store::MemoryStore;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, EmbeddingModel, StoreBackend};

/// Both pipelines over one shared store and embedder.
pub struct App {
    pub ingest: IngestPipeline,
    pub query: QueryPipeline,
    store: Arc<dyn VectorStore>,
}

impl App {
    /// Build and initialize every component described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(config).await?;
        let store = create_store(config)?;
        store.init().await?;
        Self::with_components(config, store, embedder)
    }

    /// Assemble pipelines around an initialized store and embedder.
    pub fn with_components(
        config: &Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(Error::Config(format!(
                "embedder `{}` produces {}-dimensional vectors, store expects {}",
                embedder.model_name(),
                embedder.dimension(),
                store.dimension()
            )));
        }

        let pool = Arc::new(EmbedderPool::new(embedder, config.embedding.max_concurrent));
        let ingest = IngestPipeline::new(
            Arc::clone(&store),
            Arc::new(ExtractorRegistry::with_defaults()),
            Arc::new(FixedSizeChunker::new()),
            Arc::clone(&pool),
            IngestConfig {
                chunk_config: config.chunk_config()?,
                embed_config: config.embed_config(),
            },
        );
        let query = QueryPipeline::new(Arc::clone(&store), pool, config.query_settings());

        Ok(Self {
            ingest,
            query,
            store,
        })
    }

    /// The shared store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }
}

/// Create the configured vector store (not yet initialized).
pub fn create_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let dimension = config.embedding.dimension;
    let metric = config.store.metric;

    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store ({} dims, {})", dimension, metric);
            Ok(Arc::new(MemoryStore::new(dimension, metric)))
        }
        StoreBackend::Lance => create_lance_store(config),
    }
}

#[cfg(feature = "lancedb")]
fn create_lance_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let path = config
        .store_path()
        .ok_or_else(|| Error::Config("cannot determine data directory for store".to_string()))?;
    info!("Using LanceDB store at {:?}", path);
    Ok(Arc::new(docrag_store::LanceStore::new(
        path,
        config.embedding.dimension,
        config.store.metric,
    )))
}

#[cfg(not(feature = "lancedb"))]
fn create_lance_store(_config: &Config) -> Result<Arc<dyn VectorStore>> {
    Err(Error::Config(
        "store.backend = \"lance\" requires building with the `lancedb` feature".to_string(),
    ))
}

/// Create the configured embedder, loading model weights if needed.
pub async fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.model {
        EmbeddingModel::Hashing => {
            let embedder = HashingEmbedder::with_dimension(config.embedding.dimension)?;
            Ok(Arc::new(embedder))
        }
        EmbeddingModel::Minilm => create_minilm().await,
    }
}

#[cfg(feature = "candle")]
async fn create_minilm() -> Result<Arc<dyn Embedder>> {
    let cache_dir = crate::config::cache_dir()
        .ok_or_else(|| Error::Config("cannot determine cache directory for models".to_string()))?
        .join("models");
    let embedder = docrag_embed::CandleEmbedder::new(cache_dir);

    info!("Initializing embedder (this may download the model on first run)...");
    embedder.init().await?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "candle"))]
async fn create_minilm() -> Result<Arc<dyn Embedder>> {
    Err(Error::Config(
        "embedding.model = \"minilm\" requires building with the `candle` feature".to_string(),
    ))
}
