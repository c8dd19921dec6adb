//! Embedding infrastructure: the HTTP embedding client and its
//! query-result cache.

pub mod cache;
pub mod http;
