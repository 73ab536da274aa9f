//! Shared embedder with concurrency control.
//!
//! One embedder is loaded per process and handed to both pipelines through
//! an [`EmbedderPool`]. The pool bounds how many inference calls run at once
//! and checks every result against the model's declared dimension before it
//! reaches a store.

use docrag_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Process-wide embedder with a cap on concurrent inference.
pub struct EmbedderPool {
    embedder: Arc<dyn Embedder>,
    /// Semaphore to limit concurrent inference
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl EmbedderPool {
    /// Create a new embedder pool. `max_concurrent` is raised to 1 if zero.
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            embedder,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Get the embedding dimension.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Get the underlying embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Embed a batch of texts in one model call.
    pub async fn embed_batch(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        debug!("Embedding batch of {} texts", texts.len());
        let outputs = self.embedder.embed_text(texts, config).await?;

        if outputs.len() != texts.len() {
            return Err(EmbedError::Inference(format!(
                "model returned {} embeddings for {} inputs",
                outputs.len(),
                texts.len()
            )));
        }
        for output in &outputs {
            self.check_dimension(output)?;
        }

        Ok(outputs)
    }

    /// Embed a single query.
    pub async fn embed_query(
        &self,
        query: &str,
        config: &EmbeddingConfig,
    ) -> Result<EmbeddingOutput, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        let output = self.embedder.embed_query(query, config).await?;
        self.check_dimension(&output)?;
        Ok(output)
    }

    fn check_dimension(&self, output: &EmbeddingOutput) -> Result<(), EmbedError> {
        let expected = self.embedder.dimension();
        if output.embedding.len() != expected {
            return Err(EmbedError::DimensionMismatch {
                expected,
                actual: output.embedding.len(),
            });
        }
        Ok(())
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent operations.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
