//! # docrag-core
//!
//! Core types and traits shared by every docrag crate.
//!
//! ## Architecture
//!
//! ```text
//! bytes -> ContentExtractor -> Chunker -> Embedder -> VectorStore (per document)
//!                                                         |
//!                               query -> Embedder -> SearchQuery -> SearchResult
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocumentId`] | Identity of an ingested document |
//! | [`Chunk`] | A stored text window with its embedding |
//! | [`ChunkConfig`] | Window size and overlap, in characters |
//! | [`SearchQuery`] | Document-scoped vector search |
//! | [`SearchResult`] | A ranked chunk with its similarity score |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ContentExtractor`] | Extract plain text from document bytes |
//! | [`Chunker`] | Split text into overlapping windows |
//! | [`Embedder`] | Generate vector embeddings |
//! | [`VectorStore`] | Replace and search chunks per document |
//!
//! ## Related Crates
//!
//! - `docrag-extract`: Content extraction implementations
//! - `docrag-chunker`: Fixed-size window chunker
//! - `docrag-embed`: Embedding generation
//! - `docrag-store`: In-memory and `LanceDB` vector stores
//! - `docrag-index`: Ingestion pipeline
//! - `docrag-query`: Query pipeline

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChunkError, EmbedError, Error, ErrorClass, ExtractError, Result, StoreError};
pub use traits::*;
pub use types::*;
