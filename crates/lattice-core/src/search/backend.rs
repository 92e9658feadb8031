//! Backend contracts consumed by the hybrid orchestrator
//!
//! Each retrieval strategy sits behind a small async trait taking a typed
//! request. The orchestrator receives them by injection, so tests can swap
//! in fakes and the SQLite store is only one possible implementation.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::{GraphError, Neighbor, NeighborQuery};
use crate::model::{Entity, RankedHit};

// ============================================================================
// STAGES
// ============================================================================

/// Pipeline stage, used to attribute failures and timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Query embedding
    Embed,
    /// Lexical (BM25) retrieval
    Lexical,
    /// Vector retrieval
    Vector,
    /// Graph expansion
    Graph,
    /// Entity lookup for display fields
    Lookup,
}

impl Stage {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Embed => "embed",
            Stage::Lexical => "lexical",
            Stage::Vector => "vector",
            Stage::Graph => "graph",
            Stage::Lookup => "lookup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Error reported by a retrieval backend
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// Backend could not be reached or failed internally
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// Query vector length differs from the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Index dimensionality
        expected: usize,
        /// Query vector length
        got: usize,
    },
    /// Relationship type is not part of the schema
    #[error("Unknown relationship type: {0}")]
    UnknownRelationshipType(String),
}

impl From<GraphError> for BackendError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::UnknownRelationshipType(t) => BackendError::UnknownRelationshipType(t),
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

// ============================================================================
// TYPED REQUESTS
// ============================================================================

/// Full-text query request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalQuery {
    /// Raw query text (sanitized by the backend)
    pub text: String,
    /// Maximum number of hits
    pub limit: usize,
}

impl LexicalQuery {
    /// Create a lexical query
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
        }
    }
}

/// Nearest-neighbor query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorQuery {
    /// Query embedding
    pub vector: Vec<f32>,
    /// Maximum number of hits
    pub limit: usize,
}

impl VectorQuery {
    /// Create a vector query
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self { vector, limit }
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Term-based relevance search
#[async_trait]
pub trait LexicalBackend: Send + Sync {
    /// Up to `limit` entities ranked by BM25; empty when nothing matches
    async fn search_text(&self, query: &LexicalQuery) -> Result<Vec<RankedHit>, BackendError>;
}

/// Dense-vector similarity search
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Up to `limit` entities, closest first
    async fn search_vector(&self, query: &VectorQuery) -> Result<Vec<RankedHit>, BackendError>;

    /// Index dimensionality, if an index has been built
    fn dimensions(&self) -> Option<usize>;
}

/// Bounded-depth relationship traversal
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Nodes reachable from the seeds (seeds excluded)
    async fn neighbors(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, BackendError>;
}

/// Entity lookup by id, for display fields
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Entities among `ids` that exist; unknown ids are simply absent
    async fn get_entities(&self, ids: &[String]) -> Result<HashMap<String, Entity>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_conversion() {
        let err: BackendError = GraphError::UnknownRelationshipType("likes".to_string()).into();
        assert_eq!(err, BackendError::UnknownRelationshipType("likes".to_string()));

        let err: BackendError = GraphError::UnknownSource("x".to_string()).into();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Embed.to_string(), "embed");
        assert_eq!(Stage::Lookup.as_str(), "lookup");
    }
}
