//! Arrow schema for persona memory chunk rows.
//!
//! The metadata map is stored JSON-encoded in a Utf8 column; the embedding
//! is a FixedSizeList of Float32 whose length is the configured embedding
//! dimension.

use arrow_schema::{DataType, Field, Schema};

use std::sync::Arc;

/// Schema for one persona's memory chunk table.
///
/// Columns: id, text, metadata (JSON), kind, vector.
pub fn memory_chunk_schema(dimension: i32) -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension,
            ),
            true,
        ),
    ])
}
