//! Core types for docrag.
//!
//! ## Documents
//! - [`DocumentId`]: Caller-supplied identity of an ingested document
//!
//! ## Chunks
//! - [`Chunk`]: A stored text window with its embedding
//! - [`ChunkPayload`]: Text and vector handed to the store on ingestion
//! - [`ChunkConfig`]: Window size and overlap
//!
//! ## Extraction
//! - [`ExtractedContent`]: Plain text pulled out of a document
//!
//! ## Embeddings
//! - [`EmbeddingConfig`]: Configuration for embedding generation
//! - [`EmbeddingOutput`]: Result of embedding a text
//!
//! ## Search
//! - [`SearchQuery`]: A document-scoped vector search
//! - [`SearchResult`]: A matching chunk with similarity score
//! - [`DistanceMetric`]: Vector similarity calculation method

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ChunkError;

/// Number of results returned when a caller does not ask for a specific limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

// ============================================================================
// Documents
// ============================================================================

/// Identity of a document, stable across re-ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// ============================================================================
// Chunks
// ============================================================================

/// A stored window of document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning document
    pub document_id: DocumentId,
    /// Position in the document (0-indexed, dense)
    pub chunk_index: u32,
    /// Trimmed window text, possibly empty
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Model that produced the embedding
    pub embedding_model: String,
    /// When the ingestion that wrote this chunk ran
    pub indexed_at: DateTime<Utc>,
}

/// Text and vector for one chunk, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayload {
    pub text: String,
    pub embedding: Vec<f32>,
}

impl ChunkPayload {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Content extracted from a document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// Main text content
    pub text: String,
    /// Document-level metadata
    pub metadata: ContentMetadataInfo,
}

impl ExtractedContent {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ContentMetadataInfo::default(),
        }
    }
}

/// Metadata extracted from document content.
#[derive(Debug, Clone, Default)]
pub struct ContentMetadataInfo {
    /// Document title
    pub title: Option<String>,
    /// Author
    pub author: Option<String>,
    /// Page count (for PDFs)
    pub page_count: Option<u32>,
}

// ============================================================================
// Chunking
// ============================================================================

/// Configuration for chunking. Sizes are in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Window length
    pub chunk_size: usize,
    /// Characters shared between consecutive windows
    pub overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject windows that would never advance.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of consecutive windows.
    #[must_use]
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// Output from a chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutput {
    /// Trimmed window content
    pub content: String,
    /// Character range of the untrimmed window in the source
    pub char_range: Range<usize>,
}

// ============================================================================
// Embedding
// ============================================================================

/// Configuration for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Normalize embeddings to unit length
    pub normalize: bool,
    /// Batch size for processing
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            batch_size: 32,
        }
    }
}

/// Output from embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Number of tokens in input
    pub token_count: usize,
}

// ============================================================================
// Search
// ============================================================================

/// A search restricted to one document.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Document whose chunks are ranked
    pub document_id: DocumentId,
    /// Query embedding
    pub embedding: Vec<f32>,
    /// Maximum results to return
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(document_id: DocumentId, embedding: Vec<f32>) -> Self {
        Self {
            document_id,
            embedding,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Distance metric for vector search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => f.write_str("cosine"),
            Self::L2 => f.write_str("l2"),
            Self::Dot => f.write_str("dot"),
        }
    }
}

/// A search result. Higher scores are more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Position of the chunk in its document
    pub chunk_index: u32,
    /// Chunk text
    pub text: String,
    /// Similarity score
    pub score: f32,
}

/// Vector store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of chunks
    pub total_chunks: u64,
    /// Number of documents with at least one chunk
    pub total_documents: u64,
    /// Embedding dimension
    pub dimension: usize,
    /// Distance metric used for ranking
    pub metric: DistanceMetric,
    /// Last update time
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// Ingestion
// ============================================================================

/// Summary of one successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: DocumentId,
    pub chunk_count: usize,
    /// Chunk texts in index order
    pub chunks: Vec<String>,
}
