//! Memory chunk types for Eidolon.
//!
//! A chunk is the retrievable unit of persona memory: one question/answer
//! pair rendered as text plus its metadata. Chunks are produced by the
//! chunker, stored per persona in the vector index, and returned from
//! semantic search as [`ScoredChunk`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Kind of a memory chunk.
///
/// Currently only question/answer pairs exist; the kind is validated on
/// ingestion so that future kinds cannot slip in unnoticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    QaPair,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkKind::QaPair => write!(f, "qa_pair"),
        }
    }
}

impl FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qa_pair" => Ok(ChunkKind::QaPair),
            other => Err(format!("invalid chunk kind: '{other}'")),
        }
    }
}

/// A retrievable unit of persona memory.
///
/// `id` is stable across rebuilds for the same source record: the source
/// answer id when present, otherwise a content hash of `text`. This is what
/// makes re-chunking and rebuilds idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryChunk {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, Value>,
    pub kind: ChunkKind,
}

/// A memory chunk returned from semantic search, with its similarity score.
///
/// `similarity` is in [0, 1], higher is closer. Results from a search are
/// ordered by descending similarity with ties keeping insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, Value>,
    pub similarity: f32,
}

/// Health of a persona's vector collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    /// Collection exists and holds at least one vector.
    Ready,
    /// Collection exists but is empty (valid state for a new persona).
    Empty,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexStatus::Ready => write!(f, "ready"),
            IndexStatus::Empty => write!(f, "empty"),
        }
    }
}

/// Statistics for a persona's vector collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub vector_count: u64,
    pub status: IndexStatus,
}
