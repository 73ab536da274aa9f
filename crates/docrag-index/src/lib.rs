//! Document ingestion for docrag.
//!
//! [`IngestPipeline`] runs one document through
//! extraction → chunking → embedding → storage and replaces whatever the
//! store held for that document id. Nothing is written when any step fails.
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag_index::{IngestConfig, IngestPipeline, IngestUpdate};
//!
//! let pipeline = IngestPipeline::new(store, extractors, chunker, embedder, IngestConfig::default());
//!
//! let mut updates = pipeline.subscribe();
//! let report = pipeline
//!     .ingest(document_id, &bytes, Some("application/pdf"), Some("report.pdf"))
//!     .await?;
//!
//! while let Ok(update) = updates.try_recv() {
//!     if let IngestUpdate::Indexed { chunk_count, .. } = update { /* ... */ }
//! }
//! ```

pub mod ingest;

pub use ingest::{IngestConfig, IngestPipeline, IngestUpdate};
