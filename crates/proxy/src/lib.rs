//! Query-time HTTP server.
//!
//! Serves the index file and a local search API, and forwards every other
//! `/api` request to the embedding service with path rewriting.

pub mod rewrite;
pub mod server;

pub use rewrite::rewrite_path;
pub use server::{router, serve, ProxyState, SearchRequest};
