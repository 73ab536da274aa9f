//! In-memory vector store.
//!
//! All chunks live in a map keyed by document. `replace` swaps a document's
//! whole chunk list under one write lock, so readers see either the old set
//! or the new one and never a mix. Search is exact brute force.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docrag_core::{
    Chunk, DistanceMetric, DocumentId, SearchQuery, SearchResult, StoreError, StoreStats,
    VectorStore,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::scoring::{rank, similarity};
use crate::stamp_chunks;

#[derive(Default)]
struct Inner {
    documents: HashMap<DocumentId, Vec<Chunk>>,
    last_updated: Option<DateTime<Utc>>,
}

/// In-memory vector store. Contents are lost when the process exits.
///
/// # Example
///
/// ```rust
/// use docrag_store::MemoryStore;
/// use docrag_core::{DistanceMetric, VectorStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new(384, DistanceMetric::Cosine);
/// store.init().await?;
///
/// let stats = store.stats().await?;
/// assert_eq!(stats.total_chunks, 0);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    dimension: usize,
    metric: DistanceMetric,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a new in-memory store with the given embedding dimension and metric.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(384, DistanceMetric::Cosine)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn init(&self) -> Result<(), StoreError> {
        debug!(
            "MemoryStore initialized (dimension: {}, metric: {})",
            self.dimension, self.metric
        );
        Ok(())
    }

    async fn replace(&self, document_id: DocumentId, chunks: Vec<Chunk>) -> Result<u64, StoreError> {
        let chunks = stamp_chunks(document_id, chunks, self.dimension)?;
        let count = chunks.len() as u64;

        let mut inner = self.inner.write().await;
        if chunks.is_empty() {
            inner.documents.remove(&document_id);
        } else {
            inner.documents.insert(document_id, chunks);
        }
        inner.last_updated = Some(Utc::now());

        debug!("Replaced chunks of {} with {} new chunks", document_id, count);
        Ok(count)
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchResult>, StoreError> {
        if query.embedding.len() != self.dimension {
            return Err(StoreError::Query(format!(
                "query vector has dimension {}, store expects {}",
                query.embedding.len(),
                self.dimension
            )));
        }

        let inner = self.inner.read().await;
        let Some(chunks) = inner.documents.get(&query.document_id) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SearchResult> = chunks
            .iter()
            .map(|chunk| SearchResult {
                chunk_index: chunk.chunk_index,
                text: chunk.text.clone(),
                score: similarity(self.metric, &query.embedding, &chunk.embedding),
            })
            .collect();
        rank(&mut results, query.limit);

        Ok(results)
    }

    async fn delete_document(&self, document_id: DocumentId) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .documents
            .remove(&document_id)
            .map_or(0, |chunks| chunks.len() as u64);
        if removed > 0 {
            inner.last_updated = Some(Utc::now());
        }
        debug!("Deleted {} chunks of {}", removed, document_id);
        Ok(removed)
    }

    async fn get_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(&document_id).cloned().unwrap_or_default())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.inner.read().await;
        Ok(StoreStats {
            total_chunks: inner.documents.values().map(|c| c.len() as u64).sum(),
            total_documents: inner.documents.len() as u64,
            dimension: self.dimension,
            metric: self.metric,
            last_updated: inner.last_updated,
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TEST_DIM: usize = 4;

    fn chunk(text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            document_id: DocumentId::new(),
            chunk_index: 99,
            text: text.to_string(),
            embedding,
            embedding_model: "test-model".to_string(),
            indexed_at: Utc::now(),
        }
    }

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; TEST_DIM];
        v[i] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_replace_assigns_positions_and_owner() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let doc = DocumentId::new();

        let written = store
            .replace(doc, vec![chunk("a", axis(0)), chunk("b", axis(1))])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let chunks = store.get_chunks(doc).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert!(chunks.iter().all(|c| c.document_id == doc));
    }

    #[tokio::test]
    async fn test_replace_overwrites_previous_chunks() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let doc = DocumentId::new();

        store
            .replace(doc, vec![chunk("c1", axis(0)), chunk("c2", axis(1))])
            .await
            .unwrap();
        store.replace(doc, vec![chunk("c3", axis(2))]).await.unwrap();

        let chunks = store.get_chunks(doc).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "c3");
    }

    #[tokio::test]
    async fn test_replace_with_nothing_clears_document() {
        let store = MemoryStore::default();
        let doc = DocumentId::new();
        store.replace(doc, vec![chunk("x", vec![1.0; 384])]).await.unwrap();

        store.replace(doc, Vec::new()).await.unwrap();

        assert!(store.get_chunks(doc).await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap().total_documents, 0);
    }

    #[tokio::test]
    async fn test_replace_rejects_wrong_dimension() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let doc = DocumentId::new();
        store.replace(doc, vec![chunk("ok", axis(0))]).await.unwrap();

        let err = store
            .replace(doc, vec![chunk("ok", axis(1)), chunk("bad", vec![1.0; 3])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Insert(_)));

        // Failed replace leaves the previous chunks untouched.
        let chunks = store.get_chunks(doc).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "ok");
    }

    #[tokio::test]
    async fn test_search_ranks_within_document() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let doc = DocumentId::new();
        store
            .replace(
                doc,
                vec![
                    chunk("north", axis(0)),
                    chunk("east", axis(1)),
                    chunk("north-east", vec![0.7, 0.7, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = store
            .search(SearchQuery::new(doc, axis(0)))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "north");
        assert_eq!(results[1].text, "north-east");
        assert_eq!(results[2].text, "east");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_is_isolated_per_document() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let doc_a = DocumentId::new();
        let doc_b = DocumentId::new();
        store.replace(doc_a, vec![chunk("alpha", axis(0))]).await.unwrap();
        store.replace(doc_b, vec![chunk("beta", axis(0))]).await.unwrap();

        let results = store
            .search(SearchQuery::new(doc_a, axis(0)))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "alpha");
    }

    #[tokio::test]
    async fn test_search_unknown_document_is_empty() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let results = store
            .search(SearchQuery::new(DocumentId::new(), axis(0)))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Dot);
        let doc = DocumentId::new();
        let chunks = (0..8).map(|i| chunk(&format!("c{i}"), axis(i % TEST_DIM))).collect();
        store.replace(doc, chunks).await.unwrap();

        let results = store
            .search(SearchQuery::new(doc, axis(0)).with_limit(3))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        // c0 and c4 match exactly; ties keep document order.
        assert_eq!(results[0].chunk_index, 0);
        assert_eq!(results[1].chunk_index, 4);
    }

    #[tokio::test]
    async fn test_search_rejects_wrong_query_dimension() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let err = store
            .search(SearchQuery::new(DocumentId::new(), vec![1.0; 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::Cosine);
        let doc = DocumentId::new();
        store
            .replace(doc, vec![chunk("a", axis(0)), chunk("b", axis(1))])
            .await
            .unwrap();

        assert_eq!(store.delete_document(doc).await.unwrap(), 2);
        assert_eq!(store.delete_document(doc).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::new(TEST_DIM, DistanceMetric::L2);
        assert!(store.stats().await.unwrap().last_updated.is_none());

        store
            .replace(DocumentId::new(), vec![chunk("a", axis(0)), chunk("b", axis(1))])
            .await
            .unwrap();
        store
            .replace(DocumentId::new(), vec![chunk("c", axis(2))])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.dimension, TEST_DIM);
        assert_eq!(stats.metric, DistanceMetric::L2);
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_replaces_never_mix() {
        let store = Arc::new(MemoryStore::new(TEST_DIM, DistanceMetric::Cosine));
        let doc = DocumentId::new();

        let handles: Vec<_> = (0..8)
            .map(|round| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let chunks = (0..=round)
                        .map(|i| chunk(&format!("round {round} chunk {i}"), axis(i % TEST_DIM)))
                        .collect();
                    store.replace(doc, chunks).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let chunks = store.get_chunks(doc).await.unwrap();
        let round = chunks.len() - 1;
        let prefix = format!("round {round} ");
        assert!(chunks.iter().all(|c| c.text.starts_with(&prefix)));
    }
}
