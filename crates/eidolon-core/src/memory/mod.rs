//! Memory subsystem for Eidolon.
//!
//! This module turns recorded answers into retrievable chunks and defines
//! the traits the vector infrastructure implements:
//! - `Chunker`: answer record -> memory chunk with a stable id
//! - `Embedder`: text -> fixed-dimension vector (implementations in infra)
//! - `VectorIndex`: per-persona collection of vectors with similarity search
//! - `IndexManager`: bulk and incremental index maintenance

pub mod box_embedder;
pub mod box_vector;
pub mod chunker;
pub mod embedder;
pub mod indexer;
pub mod vector;
