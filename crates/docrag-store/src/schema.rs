//! Arrow schema for the `LanceDB` chunks table.

use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const CHUNKS_TABLE: &str = "chunks";

/// Name of the embedding column. `LanceDB` searches `vector` by default.
pub const VECTOR_COLUMN: &str = "vector";

/// Schema for the chunks table.
#[must_use]
pub fn chunks_schema(embedding_dim: usize) -> Schema {
    Schema::new(vec![
        // Identity
        Field::new("document_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        // Content
        Field::new("text", DataType::Utf8, false),
        // Embedding
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                embedding_dim as i32,
            ),
            false,
        ),
        // Metadata
        Field::new("embedding_model", DataType::Utf8, false),
        Field::new("indexed_at", DataType::Utf8, false),
    ])
}

/// Embedding width recorded in an existing table schema.
#[must_use]
pub fn vector_dimension(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}
