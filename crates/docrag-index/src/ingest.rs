//! Ingestion pipeline.

use chrono::{DateTime, Utc};
use docrag_core::{
    Chunk, ChunkConfig, ChunkPayload, Chunker, DocumentId, EmbeddingConfig, Error, IngestReport,
    Result, VectorStore,
};
use docrag_embed::EmbedderPool;
use docrag_extract::ExtractorRegistry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Ingestion progress events.
#[derive(Debug, Clone)]
pub enum IngestUpdate {
    Started {
        document_id: DocumentId,
    },
    Indexed {
        document_id: DocumentId,
        chunk_count: usize,
    },
    Failed {
        document_id: DocumentId,
        error: String,
    },
}

/// Configuration for ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    /// Chunk configuration
    pub chunk_config: ChunkConfig,
    /// Embedding configuration
    pub embed_config: EmbeddingConfig,
}

/// Runs documents through extract → chunk → embed → replace.
pub struct IngestPipeline {
    /// Vector store
    store: Arc<dyn VectorStore>,
    /// Extractor registry
    extractors: Arc<ExtractorRegistry>,
    /// Chunking strategy
    chunker: Arc<dyn Chunker>,
    /// Embedder pool
    embedder: Arc<EmbedderPool>,
    /// Configuration
    config: IngestConfig,
    /// Update broadcast
    update_tx: broadcast::Sender<IngestUpdate>,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline.
    pub fn new(
        store: Arc<dyn VectorStore>,
        extractors: Arc<ExtractorRegistry>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<EmbedderPool>,
        config: IngestConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);

        Self {
            store,
            extractors,
            chunker,
            embedder,
            config,
            update_tx,
        }
    }

    /// Subscribe to ingestion updates.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestUpdate> {
        self.update_tx.subscribe()
    }

    /// Get the configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Get the underlying store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// Ingest raw document bytes.
    ///
    /// `declared_type` wins over the filename when both are given. On
    /// success the document's previous chunks are gone and the new ones are
    /// stored; on failure the store is untouched.
    pub async fn ingest(
        &self,
        document_id: DocumentId,
        data: &[u8],
        declared_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<IngestReport> {
        self.tracked(document_id, async {
            let content = self
                .extractors
                .extract_bytes(data, declared_type, filename)
                .await?;
            debug!(
                "Extracted {} chars from {} ({} bytes)",
                content.text.len(),
                document_id,
                data.len()
            );
            self.index_text(document_id, content.text.trim()).await
        })
        .await
    }

    /// Ingest text that needs no extraction.
    pub async fn ingest_text(&self, document_id: DocumentId, text: &str) -> Result<IngestReport> {
        self.tracked(document_id, self.index_text(document_id, text.trim()))
            .await
    }

    /// Remove a document. Returns how many chunks were deleted.
    pub async fn delete(&self, document_id: DocumentId) -> Result<u64> {
        let deleted = self.store.delete_document(document_id).await?;
        info!("Deleted {} ({} chunks)", document_id, deleted);
        Ok(deleted)
    }

    /// Run one ingestion and broadcast its outcome.
    async fn tracked<F>(&self, document_id: DocumentId, work: F) -> Result<IngestReport>
    where
        F: std::future::Future<Output = Result<IngestReport>>,
    {
        let _ = self.update_tx.send(IngestUpdate::Started { document_id });

        match work.await {
            Ok(report) => {
                info!("Indexed {} ({} chunks)", document_id, report.chunk_count);
                let _ = self.update_tx.send(IngestUpdate::Indexed {
                    document_id,
                    chunk_count: report.chunk_count,
                });
                Ok(report)
            }
            Err(e) => {
                error!("Failed to index {}: {}", document_id, e);
                let _ = self.update_tx.send(IngestUpdate::Failed {
                    document_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Chunk, embed and store already-extracted text.
    async fn index_text(&self, document_id: DocumentId, text: &str) -> Result<IngestReport> {
        let windows = self.chunker.chunk(text, &self.config.chunk_config)?;
        let texts: Vec<&str> = windows.iter().map(|w| w.content.as_str()).collect();

        let embeddings = self
            .embedder
            .embed_batch(&texts, &self.config.embed_config)
            .await?;

        let payloads: Vec<ChunkPayload> = windows
            .into_iter()
            .zip(embeddings)
            .map(|(window, output)| ChunkPayload::new(window.content, output.embedding))
            .collect();

        let texts: Vec<String> = payloads.iter().map(|p| p.text.clone()).collect();
        let chunks = build_chunks(document_id, payloads, self.embedder.model_name(), Utc::now());

        let written = self.store.replace(document_id, chunks).await?;
        let chunk_count = usize::try_from(written)
            .map_err(|_| Error::Other(format!("chunk count {written} overflows usize")))?;

        Ok(IngestReport {
            document_id,
            chunk_count,
            chunks: texts,
        })
    }
}

/// Build stored chunks from payloads in document order.
fn build_chunks(
    document_id: DocumentId,
    payloads: Vec<ChunkPayload>,
    model_name: &str,
    now: DateTime<Utc>,
) -> Vec<Chunk> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(idx, payload)| Chunk {
            document_id,
            chunk_index: idx as u32,
            text: payload.text,
            embedding: payload.embedding,
            embedding_model: model_name.to_string(),
            indexed_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docrag_chunker::FixedSizeChunker;
    use docrag_core::{
        DistanceMetric, EmbedError, Embedder, EmbeddingOutput, ErrorClass, ExtractError,
        SearchQuery, SearchResult, StoreError, StoreStats,
    };
    use docrag_store::MemoryStore;

    const TEST_DIM: usize = 8;

    // ==================== Mock Embedder ====================

    /// Embeds every text as a one-hot vector keyed by its length.
    struct MockEmbedder {
        dimension: usize,
        fail: bool,
    }

    impl MockEmbedder {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                fail: false,
            }
        }

        fn failing(dimension: usize) -> Self {
            Self {
                dimension,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn max_tokens(&self) -> usize {
            512
        }

        async fn embed_text(
            &self,
            texts: &[&str],
            _config: &EmbeddingConfig,
        ) -> std::result::Result<Vec<EmbeddingOutput>, EmbedError> {
            if self.fail {
                return Err(EmbedError::Inference("model unavailable".to_string()));
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let mut embedding = vec![0.0; self.dimension];
                    embedding[t.len() % self.dimension] = 1.0;
                    EmbeddingOutput {
                        embedding,
                        token_count: 1,
                    }
                })
                .collect())
        }
    }

    // ==================== Failing VectorStore ====================

    struct FailingStore;

    #[async_trait]
    impl VectorStore for FailingStore {
        async fn init(&self) -> std::result::Result<(), StoreError> {
            Ok(())
        }

        async fn replace(
            &self,
            _document_id: DocumentId,
            _chunks: Vec<Chunk>,
        ) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Insert("disk full".to_string()))
        }

        async fn search(
            &self,
            _query: SearchQuery,
        ) -> std::result::Result<Vec<SearchResult>, StoreError> {
            Ok(vec![])
        }

        async fn delete_document(
            &self,
            _document_id: DocumentId,
        ) -> std::result::Result<u64, StoreError> {
            Ok(0)
        }

        async fn get_chunks(
            &self,
            _document_id: DocumentId,
        ) -> std::result::Result<Vec<Chunk>, StoreError> {
            Ok(vec![])
        }

        async fn stats(&self) -> std::result::Result<StoreStats, StoreError> {
            Ok(StoreStats::default())
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        fn metric(&self) -> DistanceMetric {
            DistanceMetric::Cosine
        }
    }

    // ==================== Helpers ====================

    fn small_config() -> IngestConfig {
        IngestConfig {
            chunk_config: ChunkConfig::new(5, 2).unwrap(),
            embed_config: EmbeddingConfig::default(),
        }
    }

    fn create_pipeline(
        store: Arc<dyn VectorStore>,
        embedder: MockEmbedder,
        config: IngestConfig,
    ) -> IngestPipeline {
        IngestPipeline::new(
            store,
            Arc::new(ExtractorRegistry::with_defaults()),
            Arc::new(FixedSizeChunker::new()),
            Arc::new(EmbedderPool::new(Arc::new(embedder), 1)),
            config,
        )
    }

    fn memory_pipeline(config: IngestConfig) -> (Arc<MemoryStore>, IngestPipeline) {
        let store = Arc::new(MemoryStore::new(TEST_DIM, DistanceMetric::Cosine));
        let pipeline = create_pipeline(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            MockEmbedder::new(TEST_DIM),
            config,
        );
        (store, pipeline)
    }

    // ==================== Tests ====================

    #[test]
    fn test_build_chunks_numbers_in_order() {
        let doc = DocumentId::new();
        let now = Utc::now();
        let payloads = vec![
            ChunkPayload::new("first", vec![1.0; TEST_DIM]),
            ChunkPayload::new("second", vec![0.5; TEST_DIM]),
        ];

        let chunks = build_chunks(doc, payloads, "test-model", now);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].text, "second");
        assert!(chunks.iter().all(|c| c.document_id == doc));
        assert!(chunks.iter().all(|c| c.embedding_model == "test-model"));
        assert!(chunks.iter().all(|c| c.indexed_at == now));
    }

    #[tokio::test]
    async fn test_ingest_text_stores_chunks() {
        let (store, pipeline) = memory_pipeline(small_config());
        let doc = DocumentId::new();

        let report = pipeline.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();

        assert_eq!(report.document_id, doc);
        assert_eq!(report.chunk_count, 3);
        assert_eq!(report.chunks, vec!["ABCDE", "DEFGH", "GHIJ"]);

        let stored = store.get_chunks(doc).await.unwrap();
        let texts: Vec<&str> = stored.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ABCDE", "DEFGH", "GHIJ"]);
        assert!(stored.iter().all(|c| c.embedding_model == "mock-embedder"));
        assert!(stored.iter().all(|c| c.embedding.len() == TEST_DIM));
    }

    #[tokio::test]
    async fn test_ingest_bytes_by_filename() {
        let (store, pipeline) = memory_pipeline(IngestConfig::default());
        let doc = DocumentId::new();

        let report = pipeline
            .ingest(doc, b"  plain text body \n", None, Some("notes.txt"))
            .await
            .unwrap();

        assert_eq!(report.chunk_count, 1);
        assert_eq!(report.chunks, vec!["plain text body"]);
        assert_eq!(store.get_chunks(doc).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_declared_type_wins() {
        let (_store, pipeline) = memory_pipeline(IngestConfig::default());

        let report = pipeline
            .ingest(DocumentId::new(), b"# Title", Some("text/markdown"), Some("upload.bin"))
            .await
            .unwrap();

        assert_eq!(report.chunks, vec!["# Title"]);
    }

    #[tokio::test]
    async fn test_reingest_replaces_previous_chunks() {
        let (store, pipeline) = memory_pipeline(small_config());
        let doc = DocumentId::new();

        pipeline.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();
        let report = pipeline.ingest_text(doc, "XYZ").await.unwrap();

        assert_eq!(report.chunk_count, 1);
        let stored = store.get_chunks(doc).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "XYZ");
        assert_eq!(stored[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn test_empty_document_clears_chunks() {
        let (store, pipeline) = memory_pipeline(small_config());
        let doc = DocumentId::new();

        pipeline.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();
        let report = pipeline.ingest(doc, b"   \n", None, Some("empty.txt")).await.unwrap();

        assert_eq!(report.chunk_count, 0);
        assert!(report.chunks.is_empty());
        assert!(store.get_chunks(doc).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_type_leaves_store_untouched() {
        let (store, pipeline) = memory_pipeline(small_config());
        let doc = DocumentId::new();
        pipeline.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();

        let err = pipeline
            .ingest(doc, b"\x00\x01", Some("application/zip"), Some("archive.zip"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Extraction(ExtractError::UnsupportedType(_))));
        assert_eq!(err.class(), ErrorClass::Client);
        assert_eq!(store.get_chunks(doc).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::new(TEST_DIM, DistanceMetric::Cosine));
        let doc = DocumentId::new();
        let good = create_pipeline(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            MockEmbedder::new(TEST_DIM),
            small_config(),
        );
        good.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();

        let bad = create_pipeline(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            MockEmbedder::failing(TEST_DIM),
            small_config(),
        );
        let err = bad.ingest_text(doc, "new text").await.unwrap_err();

        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(err.class(), ErrorClass::Server);
        assert_eq!(store.get_chunks(doc).await.unwrap()[0].text, "ABCDE");
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let pipeline = create_pipeline(
            Arc::new(FailingStore),
            MockEmbedder::new(TEST_DIM),
            small_config(),
        );

        let err = pipeline
            .ingest_text(DocumentId::new(), "some text")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Store(StoreError::Insert(_))));
    }

    #[tokio::test]
    async fn test_subscribe_receives_updates() {
        let (_store, pipeline) = memory_pipeline(small_config());
        let mut updates = pipeline.subscribe();
        let doc = DocumentId::new();

        pipeline.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();
        let _ = pipeline
            .ingest(doc, b"data", Some("application/zip"), None)
            .await;

        assert!(matches!(
            updates.try_recv().unwrap(),
            IngestUpdate::Started { document_id } if document_id == doc
        ));
        assert!(matches!(
            updates.try_recv().unwrap(),
            IngestUpdate::Indexed { chunk_count: 3, .. }
        ));
        assert!(matches!(updates.try_recv().unwrap(), IngestUpdate::Started { .. }));
        assert!(matches!(updates.try_recv().unwrap(), IngestUpdate::Failed { .. }));
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_document() {
        let (store, pipeline) = memory_pipeline(small_config());
        let doc = DocumentId::new();
        pipeline.ingest_text(doc, "ABCDEFGHIJ").await.unwrap();

        assert_eq!(pipeline.delete(doc).await.unwrap(), 3);
        assert_eq!(pipeline.delete(doc).await.unwrap(), 0);
        assert!(store.get_chunks(doc).await.unwrap().is_empty());
    }
}
