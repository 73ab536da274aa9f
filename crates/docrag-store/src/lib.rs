//! Vector storage layer for docrag.
//!
//! Both backends implement [`VectorStore`](docrag_core::VectorStore) with
//! the same contract: chunks are keyed by document, `replace` overwrites a
//! document's whole chunk set, and search is exact top-k restricted to one
//! document.
//!
//! | Backend | Persistence | Feature |
//! |---------|-------------|---------|
//! | [`MemoryStore`] | none | always available |
//! | `LanceStore` | `LanceDB` directory on disk | `lancedb` |
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag_store::LanceStore;
//! use docrag_core::{DistanceMetric, VectorStore};
//!
//! let store = LanceStore::new("path/to/index.lance".into(), 384, DistanceMetric::Cosine);
//! store.init().await?;
//! store.replace(document_id, chunks).await?;
//! let results = store.search(query).await?;
//! ```

#[cfg(feature = "lancedb")]
pub mod lancedb;
#[cfg(feature = "lancedb")]
pub mod schema;

pub mod memory;
pub mod scoring;

#[cfg(feature = "lancedb")]
pub use lancedb::LanceStore;
pub use memory::MemoryStore;

use docrag_core::{Chunk, DocumentId, StoreError};

/// Stamp chunks with their owner and position, rejecting foreign dimensions.
pub(crate) fn stamp_chunks(
    document_id: DocumentId,
    chunks: Vec<Chunk>,
    dimension: usize,
) -> Result<Vec<Chunk>, StoreError> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(position, mut chunk)| {
            if chunk.embedding.len() != dimension {
                return Err(StoreError::Insert(format!(
                    "chunk {position} has embedding dimension {}, store expects {dimension}",
                    chunk.embedding.len()
                )));
            }
            chunk.document_id = document_id;
            chunk.chunk_index = u32::try_from(position)
                .map_err(|_| StoreError::Insert("too many chunks for one document".to_string()))?;
            Ok(chunk)
        })
        .collect()
}
