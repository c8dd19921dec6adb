//! SQLite persistence for Eidolon.
//!
//! Affinity records live in SQLite (sqlx, WAL mode, split reader/writer
//! pools); vector data lives in LanceDB.

pub mod affinity;
pub mod pool;
