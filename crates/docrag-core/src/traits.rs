//! Core traits for docrag components.
//!
//! - [`ContentExtractor`]: Pull plain text out of document bytes
//! - [`Chunker`]: Split text into windows
//! - [`Embedder`]: Generate vector embeddings
//! - [`VectorStore`]: Store and search chunks per document
//!
//! The ingestion and query pipelines only talk to these traits, so each
//! stage can be swapped (a hashing embedder in tests, an in-memory store
//! for a throwaway server) without touching the pipelines.

use async_trait::async_trait;

use crate::error::{ChunkError, EmbedError, ExtractError, StoreError};
use crate::types::{
    Chunk, ChunkConfig, ChunkOutput, DistanceMetric, DocumentId, EmbeddingConfig,
    EmbeddingOutput, ExtractedContent, SearchQuery, SearchResult, StoreStats,
};

// ============================================================================
// Content Extraction
// ============================================================================

/// Trait for extracting text from document bytes.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Returns the MIME types this extractor can handle.
    fn supported_types(&self) -> &[&str];

    /// Check if this extractor can handle the given MIME type or filename.
    fn can_extract(&self, mime_type: &str, filename: Option<&str>) -> bool {
        self.supported_types().contains(&mime_type)
            || filename.is_some_and(|name| self.can_extract_by_extension(name))
    }

    /// Check if extractor can handle based on file extension.
    fn can_extract_by_extension(&self, _filename: &str) -> bool {
        false
    }

    /// Extract content from bytes.
    async fn extract_bytes(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedContent, ExtractError>;
}

// ============================================================================
// Chunking
// ============================================================================

/// Trait for splitting text into chunks.
///
/// Chunking is pure CPU work over an in-memory string, so the trait is
/// synchronous.
pub trait Chunker: Send + Sync {
    /// Name of this chunking strategy.
    fn name(&self) -> &str;

    /// Chunk the text. Output order is document order.
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<ChunkOutput>, ChunkError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Maximum tokens per input.
    fn max_tokens(&self) -> usize;

    /// Embed text content. One output per input, same order.
    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a query string.
    async fn embed_query(
        &self,
        query: &str,
        config: &EmbeddingConfig,
    ) -> Result<EmbeddingOutput, EmbedError> {
        let results = self.embed_text(&[query], config).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Trait for document-scoped vector storage and search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the store. Safe to call more than once.
    async fn init(&self) -> Result<(), StoreError>;

    /// Replace every chunk of `document_id` with `chunks`.
    ///
    /// Stored `chunk_index` values are the positions in `chunks`, and every
    /// chunk is stamped with `document_id`. An empty slice clears the
    /// document. Returns the number of chunks written.
    async fn replace(&self, document_id: DocumentId, chunks: Vec<Chunk>) -> Result<u64, StoreError>;

    /// Rank the chunks of `query.document_id`, best first.
    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchResult>, StoreError>;

    /// Delete all chunks of a document. Returns how many were removed.
    async fn delete_document(&self, document_id: DocumentId) -> Result<u64, StoreError>;

    /// All chunks of a document ordered by `chunk_index`.
    async fn get_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>, StoreError>;

    /// Get store statistics.
    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Embedding dimension fixed at construction.
    fn dimension(&self) -> usize;

    /// Similarity metric fixed at construction.
    fn metric(&self) -> DistanceMetric;
}
