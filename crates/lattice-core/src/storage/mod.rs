//! Storage Module
//!
//! SQLite-based storage layer with:
//! - FTS5 full-text search with query sanitization
//! - Embedded vector storage, loaded into an in-memory vector index
//! - Typed relationship edges with bounded-depth traversal
//! - Async backend adapters for the hybrid orchestrator

mod backend;
mod migrations;
mod sqlite;

pub use backend::StorageBackend;
pub use migrations::MIGRATIONS;
pub use sqlite::{
    vector_from_bytes, vector_to_bytes, IngestBatch, IngestSummary, Result, Storage,
    StorageError, DB_FILE_NAME,
};
