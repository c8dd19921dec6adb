//! Infrastructure layer for Eidolon.
//!
//! Contains implementations of the port traits defined in `eidolon-core`:
//! the LanceDB vector index, the HTTP embedding client with its LRU cache,
//! the SQLite affinity store, and the hosted/local inference backends.

pub mod config;
pub mod embedding;
pub mod llm;
pub mod sqlite;
pub mod vector;
