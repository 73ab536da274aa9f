//! `LanceDB` implementation of `VectorStore`.
//!
//! Replace is delete-by-filter followed by an append. The two steps are not
//! one transaction: a crash in between leaves the document with no chunks,
//! never with a mix of old and new ones. Replaces and deletes of the same
//! document are serialized through a per-document lock; different documents
//! proceed independently.

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docrag_core::{
    Chunk, DistanceMetric, DocumentId, SearchQuery, SearchResult, StoreError, StoreStats,
    VectorStore,
};
use futures::TryStreamExt;
use lancedb::index::scalar::BTreeIndexBuilder;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::schema::{chunks_schema, vector_dimension, CHUNKS_TABLE, VECTOR_COLUMN};
use crate::scoring::{rank, score_from_distance};
use crate::stamp_chunks;

/// LanceDB-based vector store.
pub struct LanceStore {
    /// Path to the `LanceDB` database
    db_path: PathBuf,
    /// Embedding dimension
    embedding_dim: usize,
    metric: DistanceMetric,
    /// Database connection (lazy initialized)
    connection: RwLock<Option<Connection>>,
    /// Chunks table handle
    chunks_table: RwLock<Option<Table>>,
    /// One lock per document with a write in flight
    document_locks: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
}

impl LanceStore {
    /// Create a new `LanceStore`.
    #[must_use]
    pub fn new(db_path: PathBuf, embedding_dim: usize, metric: DistanceMetric) -> Self {
        Self {
            db_path,
            embedding_dim,
            metric,
            connection: RwLock::new(None),
            chunks_table: RwLock::new(None),
            document_locks: Mutex::new(HashMap::new()),
            last_updated: RwLock::new(None),
        }
    }

    /// Get the database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get or create connection.
    async fn get_connection(&self) -> Result<Connection, StoreError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        let mut conn = self.connection.write().await;
        if let Some(ref c) = *conn {
            return Ok(c.clone());
        }
        let db_path_str = self.db_path.to_string_lossy().to_string();
        let new_conn = connect(&db_path_str)
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to connect to LanceDB: {e}")))?;
        *conn = Some(new_conn.clone());
        Ok(new_conn)
    }

    /// Get or open chunks table.
    async fn get_chunks_table(&self) -> Result<Table, StoreError> {
        {
            let table = self.chunks_table.read().await;
            if let Some(ref t) = *table {
                return Ok(t.clone());
            }
        }

        let conn = self.get_connection().await?;
        let mut table_lock = self.chunks_table.write().await;
        if let Some(ref t) = *table_lock {
            return Ok(t.clone());
        }
        let table = conn
            .open_table(CHUNKS_TABLE)
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to open chunks table: {e}")))?;
        *table_lock = Some(table.clone());
        Ok(table)
    }

    /// Take the write lock for one document.
    async fn lock_document(&self, document_id: DocumentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.document_locks.lock().await;
            // Drop locks nobody else holds a handle to.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(document_id).or_default())
        };
        lock.lock_owned().await
    }

    fn distance_type(&self) -> DistanceType {
        match self.metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::L2 => DistanceType::L2,
            DistanceMetric::Dot => DistanceType::Dot,
        }
    }

    async fn touch(&self) {
        *self.last_updated.write().await = Some(Utc::now());
    }

    /// Convert chunks to Arrow `RecordBatch`.
    fn chunks_to_batch(&self, chunks: &[Chunk]) -> Result<RecordBatch, StoreError> {
        let document_ids: Vec<_> = chunks.iter().map(|c| c.document_id.to_string()).collect();
        let chunk_indices: Vec<_> = chunks.iter().map(|c| c.chunk_index).collect();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        let models: Vec<_> = chunks.iter().map(|c| c.embedding_model.as_str()).collect();
        let indexed_ats: Vec<_> = chunks.iter().map(|c| c.indexed_at.to_rfc3339()).collect();

        let schema = Arc::new(chunks_schema(self.embedding_dim));
        let vector_array = build_vector_array(chunks, self.embedding_dim);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(document_ids)),
                Arc::new(UInt32Array::from(chunk_indices)),
                Arc::new(StringArray::from(texts)),
                vector_array,
                Arc::new(StringArray::from(models)),
                Arc::new(StringArray::from(indexed_ats)),
            ],
        )
        .map_err(|e| StoreError::Insert(format!("Failed to create RecordBatch: {e}")))
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    async fn init(&self) -> Result<(), StoreError> {
        info!("Initializing LanceDB at {:?}", self.db_path);

        if let Some(parent) = self.db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Init(format!("Failed to create db directory: {e}")))?;
        }

        let conn = self.get_connection().await?;
        let tables = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to list tables: {e}")))?;

        if tables.iter().any(|t| t == CHUNKS_TABLE) {
            let table = self.get_chunks_table().await?;
            let schema = table
                .schema()
                .await
                .map_err(|e| StoreError::Schema(format!("Failed to read table schema: {e}")))?;
            match vector_dimension(&schema) {
                Some(dim) if dim == self.embedding_dim => {}
                Some(dim) => {
                    return Err(StoreError::Schema(format!(
                        "existing index stores {dim}-dimensional vectors, configured model produces {}",
                        self.embedding_dim
                    )))
                }
                None => {
                    return Err(StoreError::Schema(format!(
                        "chunks table has no `{VECTOR_COLUMN}` column"
                    )))
                }
            }
            debug!("Chunks table already present");
            return Ok(());
        }

        info!("Creating chunks table");
        let table = conn
            .create_empty_table(CHUNKS_TABLE, Arc::new(chunks_schema(self.embedding_dim)))
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to create chunks table: {e}")))?;

        for column in ["document_id", "chunk_index"] {
            if let Err(e) = table
                .create_index(&[column], Index::BTree(BTreeIndexBuilder::default()))
                .execute()
                .await
            {
                warn!("Failed to create scalar index on {column}: {e}");
            }
        }

        *self.chunks_table.write().await = Some(table);
        info!("LanceDB initialized successfully");
        Ok(())
    }

    async fn replace(&self, document_id: DocumentId, chunks: Vec<Chunk>) -> Result<u64, StoreError> {
        let chunks = stamp_chunks(document_id, chunks, self.embedding_dim)?;
        let batch = if chunks.is_empty() {
            None
        } else {
            Some(self.chunks_to_batch(&chunks)?)
        };

        let table = self.get_chunks_table().await?;
        let _guard = self.lock_document(document_id).await;

        table
            .delete(&document_filter(document_id))
            .await
            .map_err(|e| StoreError::Delete(format!("Failed to delete old chunks: {e}")))?;

        if let Some(batch) = batch {
            let schema = batch.schema();
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
            table
                .add(Box::new(batches))
                .execute()
                .await
                .map_err(|e| StoreError::Insert(format!("Failed to insert chunks: {e}")))?;
        }
        self.touch().await;

        debug!("Replaced chunks of {} with {} new chunks", document_id, chunks.len());
        Ok(chunks.len() as u64)
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchResult>, StoreError> {
        if query.embedding.len() != self.embedding_dim {
            return Err(StoreError::Query(format!(
                "query vector has dimension {}, store expects {}",
                query.embedding.len(),
                self.embedding_dim
            )));
        }
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching {} with limit {}", query.document_id, query.limit);
        let table = self.get_chunks_table().await?;

        let mut stream = table
            .vector_search(query.embedding.clone())
            .map_err(|e| StoreError::Query(format!("Failed to create search query: {e}")))?
            .column(VECTOR_COLUMN)
            .distance_type(self.distance_type())
            .only_if(document_filter(query.document_id))
            .limit(query.limit)
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to execute search: {e}")))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch results: {e}")))?
        {
            results.extend(batch_to_search_results(&batch, self.metric)?);
        }
        rank(&mut results, query.limit);

        debug!("Found {} results", results.len());
        Ok(results)
    }

    async fn delete_document(&self, document_id: DocumentId) -> Result<u64, StoreError> {
        let table = self.get_chunks_table().await?;
        let _guard = self.lock_document(document_id).await;

        let filter = document_filter(document_id);
        let existing = table
            .count_rows(Some(filter.clone()))
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count chunks: {e}")))?;
        if existing == 0 {
            return Ok(0);
        }

        table
            .delete(&filter)
            .await
            .map_err(|e| StoreError::Delete(format!("Failed to delete chunks: {e}")))?;
        self.touch().await;

        debug!("Deleted {} chunks of {}", existing, document_id);
        Ok(existing as u64)
    }

    async fn get_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>, StoreError> {
        let table = self.get_chunks_table().await?;

        let mut stream = table
            .query()
            .only_if(document_filter(document_id))
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query chunks: {e}")))?;

        let mut chunks = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch chunks: {e}")))?
        {
            chunks.extend(batch_to_chunks(&batch)?);
        }
        chunks.sort_by_key(|c| c.chunk_index);

        Ok(chunks)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let table = self.get_chunks_table().await?;

        let total_chunks = table
            .count_rows(None)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count chunks: {e}")))?;

        let mut stream = table
            .query()
            .select(Select::columns(&["document_id"]))
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query documents: {e}")))?;

        let mut documents = HashSet::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count documents: {e}")))?
        {
            let ids = string_column(&batch, "document_id")?;
            documents.extend((0..ids.len()).map(|i| ids.value(i).to_string()));
        }

        Ok(StoreStats {
            total_chunks: total_chunks as u64,
            total_documents: documents.len() as u64,
            dimension: self.embedding_dim,
            metric: self.metric,
            last_updated: *self.last_updated.read().await,
        })
    }

    fn dimension(&self) -> usize {
        self.embedding_dim
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// SQL filter selecting one document. Ids are UUIDs, so no quoting issues.
fn document_filter(document_id: DocumentId) -> String {
    format!("document_id = '{document_id}'")
}

fn build_vector_array(chunks: &[Chunk], dim: usize) -> ArrayRef {
    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), dim as i32);
    for chunk in chunks {
        builder.values().append_slice(&chunk.embedding);
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Schema(format!("missing or mistyped column `{name}`")))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| StoreError::Schema(format!("missing or mistyped column `{name}`")))
}

fn batch_to_search_results(
    batch: &RecordBatch,
    metric: DistanceMetric,
) -> Result<Vec<SearchResult>, StoreError> {
    let chunk_indices = u32_column(batch, "chunk_index")?;
    let texts = string_column(batch, "text")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| StoreError::Query("search results carry no _distance".to_string()))?;

    Ok((0..batch.num_rows())
        .map(|i| SearchResult {
            chunk_index: chunk_indices.value(i),
            text: texts.value(i).to_string(),
            score: score_from_distance(metric, distances.value(i)),
        })
        .collect())
}

fn batch_to_chunks(batch: &RecordBatch) -> Result<Vec<Chunk>, StoreError> {
    let document_ids = string_column(batch, "document_id")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;
    let texts = string_column(batch, "text")?;
    let models = string_column(batch, "embedding_model")?;
    let indexed_ats = string_column(batch, "indexed_at")?;
    let vectors = batch
        .column_by_name(VECTOR_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| StoreError::Schema(format!("missing or mistyped column `{VECTOR_COLUMN}`")))?;

    let mut chunks = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let document_id = document_ids
            .value(i)
            .parse::<DocumentId>()
            .map_err(|e| StoreError::Schema(format!("corrupt document_id: {e}")))?;
        let indexed_at = DateTime::parse_from_rfc3339(indexed_ats.value(i))
            .map_err(|e| StoreError::Schema(format!("corrupt indexed_at: {e}")))?
            .with_timezone(&Utc);
        let values = vectors.value(i);
        let embedding = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|arr| arr.values().to_vec())
            .ok_or_else(|| StoreError::Schema("vector items are not f32".to_string()))?;

        chunks.push(Chunk {
            document_id,
            chunk_index: chunk_indices.value(i),
            text: texts.value(i).to_string(),
            embedding,
            embedding_model: models.value(i).to_string(),
            indexed_at,
        });
    }

    Ok(chunks)
}
