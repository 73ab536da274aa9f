//! # docrag-embed
//!
//! Embedding generation for docrag.
//!
//! ## Cargo Features
//!
//! - `candle`: Enables [`CandleEmbedder`], a local `all-MiniLM-L6-v2` model
//!   run with the Candle ML framework
//! - Without `candle`: only [`HashingEmbedder`] is available
//!
//! ## Model Details (`candle`)
//!
//! | Property | Value |
//! |----------|-------|
//! | Model | `sentence-transformers/all-MiniLM-L6-v2` |
//! | Dimension | 384 |
//! | Max tokens | 256 |
//! | Architecture | BERT-based |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrag_embed::{EmbedderPool, HashingEmbedder};
//! use docrag_core::EmbeddingConfig;
//! use std::sync::Arc;
//!
//! let pool = EmbedderPool::new(Arc::new(HashingEmbedder::new()), 4);
//! let embeddings = pool
//!     .embed_batch(&["Hello world", "Machine learning"], &EmbeddingConfig::default())
//!     .await?;
//! ```
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CandleEmbedder`] | Transformer embeddings (requires `candle` feature) |
//! | [`HashingEmbedder`] | Deterministic feature-hashing embedder (always available) |
//! | [`EmbedderPool`] | Shared embedder with semaphore limiting (always available) |

#[cfg(feature = "candle")]
pub mod candle;

#[cfg(feature = "candle")]
pub use candle::CandleEmbedder;

pub mod hashing;
pub mod pool;

pub use hashing::HashingEmbedder;
pub use pool::EmbedderPool;
