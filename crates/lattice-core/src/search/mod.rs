//! Search Module
//!
//! Provides the hybrid retrieval pipeline:
//! - Keyword search using BM25/FTS5
//! - Vector search, exact or HNSW (USearch)
//! - Reciprocal Rank Fusion of both ranked lists
//! - Relationship-graph expansion with provenance

mod assemble;
mod backend;
mod fusion;
mod hybrid;
mod keyword;
mod vector;

pub use vector::{
    DistanceMetric, IndexKind, VectorIndex, VectorIndexConfig, VectorIndexStats,
    VectorSearchError, DEFAULT_CONNECTIVITY, DEFAULT_DIMENSIONS, DEFAULT_EXACT_THRESHOLD,
    DEFAULT_EXPANSION_ADD, DEFAULT_EXPANSION_SEARCH,
};

pub use keyword::{has_query_terms, query_terms, sanitize_fts5_query, MAX_QUERY_TERMS};

pub use fusion::{fuse, reciprocal_rank_fusion, DEFAULT_RRF_K};

pub use assemble::{assemble_results, ExpansionScoring, DEFAULT_EXPANSION_SCORE};

pub use backend::{
    BackendError, EntityLookup, GraphBackend, LexicalBackend, LexicalQuery, Stage, VectorBackend,
    VectorQuery,
};

pub use hybrid::{
    HybridSearchConfig, HybridSearchError, HybridSearcher, SearchBackends, SearchRequest,
    StageTimeouts,
};
