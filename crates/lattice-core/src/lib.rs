//! # Lattice Core
//!
//! Hybrid retrieval engine. One query runs three strategies and merges them:
//!
//! - **Lexical**: BM25 over a SQLite FTS5 index (`porter unicode61`)
//! - **Vector**: exact or HNSW (USearch) nearest neighbours over dense embeddings
//! - **Graph**: typed relationship edges expanded from the direct hits
//!
//! Lexical and vector rankings are merged with Reciprocal Rank Fusion
//! (`score(d) = Σ 1 / (k + rank_i(d))`, `k = 60`), which needs no score
//! normalization across backends. Graph neighbours of the fused hits follow
//! them as expansion hits, each tagged with the edge that reached it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lattice_core::prelude::*;
//!
//! let storage = Arc::new(Storage::new(None)?);
//! let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
//!
//! // Offline: load a corpus
//! let corpus = Corpus::from_file("corpus.json".as_ref())?;
//! Ingestor::new(storage.clone(), embedder.clone()).rebuild(corpus).await?;
//!
//! // Online: query
//! let searcher = HybridSearcher::new(
//!     SearchBackends::from_storage(storage, embedder),
//!     HybridSearchConfig::default(),
//! )?;
//! let results = searcher
//!     .hybrid_search("neural embeddings expert", SearchLimits::default())
//!     .await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings` (default): Local embedding generation with fastembed
//! - `vector-search` (default): HNSW vector search with USearch for large corpora
//! - `bundled-sqlite` (default): Bundled SQLite
//! - `encryption`: SQLCipher; set `LATTICE_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod embeddings;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod search;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Data model
pub use model::{
    namespace, Direction, Entity, ExpansionConnection, FusedHit, IndexStats, OrderedResult,
    Provenance, RankedHit, RelationshipEdge, SearchLimits, SearchMode,
};

// Configuration
pub use config::{ConfigError, EngineConfig, TimeoutsConfig};

// Embeddings
pub use embeddings::{CachedEmbedder, EmbeddingError, EmbeddingProvider, HashingEmbedder};

#[cfg(feature = "embeddings")]
pub use embeddings::{FastEmbedProvider, EMBEDDING_DIMENSIONS};

// Graph
pub use graph::{GraphError, Neighbor, NeighborQuery, RelationshipGraph};

// Search
pub use search::{
    reciprocal_rank_fusion, sanitize_fts5_query, BackendError, ExpansionScoring,
    HybridSearchConfig, HybridSearchError, HybridSearcher, SearchBackends, SearchRequest, Stage,
    StageTimeouts, VectorIndex, VectorIndexConfig,
};

// Storage
pub use storage::{IngestBatch, IngestSummary, Result, Storage, StorageBackend, StorageError};

// Ingestion
pub use ingest::{Corpus, IngestError, IngestReport, Ingestor};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Corpus, EmbeddingProvider, EngineConfig, Entity, HashingEmbedder, HybridSearchConfig,
        HybridSearchError, HybridSearcher, IngestError, Ingestor, OrderedResult, Provenance,
        RelationshipEdge, SearchBackends, SearchLimits, SearchMode, SearchRequest, Storage,
        StorageError,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::FastEmbedProvider;
}
