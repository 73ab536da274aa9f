//! Query execution.

use docrag_core::{
    DocumentId, EmbeddingConfig, Error, Result, SearchQuery, SearchResult, VectorStore,
    DEFAULT_SEARCH_LIMIT,
};
use docrag_embed::EmbedderPool;
use std::sync::Arc;
use tracing::debug;

/// Largest `k` a caller may ask for.
pub const DEFAULT_MAX_LIMIT: usize = 50;

/// Query configuration.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Results returned when the caller gives no limit
    pub default_limit: usize,
    /// Upper bound for caller-supplied limits
    pub max_limit: usize,
    /// Embedding configuration, must match ingestion
    pub embed_config: EmbeddingConfig,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_SEARCH_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            embed_config: EmbeddingConfig::default(),
        }
    }
}

/// Answers similarity queries within one document.
pub struct QueryPipeline {
    /// Vector store
    store: Arc<dyn VectorStore>,
    /// Embedder for query embedding
    embedder: Arc<EmbedderPool>,
    config: QueryConfig,
}

impl QueryPipeline {
    /// Create a new query pipeline.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<EmbedderPool>, config: QueryConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Top results for `query_text` using the default limit.
    pub async fn query(&self, document_id: DocumentId, query_text: &str) -> Result<Vec<SearchResult>> {
        self.query_with_limit(document_id, query_text, None).await
    }

    /// Top `limit` results for `query_text`, best first.
    ///
    /// `limit` is clamped to `1..=max_limit`. A document with no stored
    /// chunks yields [`Error::NotFound`].
    pub async fn query_with_limit(
        &self,
        document_id: DocumentId,
        query_text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let text = query_text.trim();
        if text.is_empty() {
            return Err(Error::InvalidQuery("query text is empty".to_string()));
        }

        let limit = self.effective_limit(limit);
        debug!("Querying {} (limit {}): {}", document_id, limit, text);

        let embedding = self
            .embedder
            .embed_query(text, &self.config.embed_config)
            .await?;

        let results = self
            .store
            .search(SearchQuery::new(document_id, embedding.embedding).with_limit(limit))
            .await?;

        if results.is_empty() {
            return Err(Error::NotFound(document_id));
        }

        debug!("Found {} results", results.len());
        Ok(results)
    }

    fn effective_limit(&self, requested: Option<usize>) -> usize {
        let max = self.config.max_limit.max(1);
        requested
            .unwrap_or(self.config.default_limit)
            .clamp(1, max)
    }
}
