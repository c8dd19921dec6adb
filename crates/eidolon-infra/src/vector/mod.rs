//! Vector database infrastructure for persona memory collections.
//!
//! Provides LanceDB store management, the Arrow schema for chunk rows, and
//! the `VectorIndex` implementation with cosine-similarity search.

pub mod index;
pub mod lance;
pub mod schema;
