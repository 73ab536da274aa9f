//! Query execution for docrag.
//!
//! A query embeds the question with the same model used at ingestion and
//! ranks the chunks of a single document against it.

pub mod executor;

pub use executor::{QueryConfig, QueryPipeline, DEFAULT_MAX_LIMIT};
