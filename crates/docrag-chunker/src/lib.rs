//! Document chunking for docrag.
//!
//! [`FixedSizeChunker`] cuts text into fixed-length character windows that
//! overlap by a configurable amount. [`chunk_text`] is the same algorithm
//! as a free function returning plain strings.

pub mod fixed;

pub use fixed::{chunk_text, FixedSizeChunker};
