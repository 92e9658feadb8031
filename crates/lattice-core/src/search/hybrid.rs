//! Hybrid Search (Keyword + Semantic + Graph Expansion)
//!
//! Query pipeline:
//! 1. Lexical query issued immediately; embedding then vector query run
//!    alongside it. Both branches are joined before fusion, and the first
//!    failure cancels the other.
//! 2. Reciprocal Rank Fusion of the two ranked lists into the top-M direct
//!    hits.
//! 3. Relationship-graph expansion from the direct hits.
//! 4. Assembly: direct hits first, expansion hits after, each tagged with
//!    provenance.
//!
//! `SearchMode::Hybrid` never drops a signal on its own. A failing or slow
//! stage fails the whole query with the stage identified.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use super::assemble::{assemble_results, ExpansionScoring};
use super::backend::{
    BackendError, EntityLookup, GraphBackend, LexicalBackend, LexicalQuery, Stage, VectorBackend,
    VectorQuery,
};
use super::fusion::{fuse, DEFAULT_RRF_K};
use super::keyword::has_query_terms;
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::graph::{Neighbor, NeighborQuery};
use crate::model::{FusedHit, OrderedResult, RankedHit, SearchLimits, SearchMode};
use crate::storage::{Storage, StorageBackend};

// ============================================================================
// ERRORS
// ============================================================================

/// Why a hybrid query could not be executed
///
/// An empty result list is never an error; every variant here means the
/// query did not run to completion.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HybridSearchError {
    /// Query text is empty or has no searchable terms
    #[error("Query cannot be empty")]
    EmptyQuery,
    /// Embedding provider rejected the query text itself
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A limit is zero or the config is unusable
    #[error("Invalid limits: {0}")]
    InvalidLimits(String),
    /// Embedding provider failed or is not loaded
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// A retrieval backend failed
    #[error("{stage} backend failed: {message}")]
    Backend {
        /// Failing stage
        stage: Stage,
        /// Backend error message
        message: String,
    },
    /// A stage exceeded its timeout
    #[error("{stage} stage timed out after {after:?}")]
    Timeout {
        /// Slow stage
        stage: Stage,
        /// Configured timeout
        after: Duration,
    },
    /// Query or index vectors have the wrong length
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Index dimensionality
        expected: usize,
        /// Offending length
        got: usize,
    },
    /// Relationship type is not part of the schema
    #[error("Unknown relationship type: {0}")]
    UnknownRelationshipType(String),
}

impl HybridSearchError {
    /// Whether retrying the same query could succeed
    ///
    /// Input and schema errors never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HybridSearchError::EmbeddingUnavailable(_)
                | HybridSearchError::Backend { .. }
                | HybridSearchError::Timeout { .. }
        )
    }

    /// Stage the error is attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            HybridSearchError::EmbeddingUnavailable(_) | HybridSearchError::InvalidQuery(_) => {
                Some(Stage::Embed)
            }
            HybridSearchError::Backend { stage, .. } | HybridSearchError::Timeout { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    fn from_backend(stage: Stage, e: BackendError) -> Self {
        match e {
            BackendError::DimensionMismatch { expected, got } => {
                HybridSearchError::DimensionMismatch { expected, got }
            }
            BackendError::UnknownRelationshipType(t) => {
                HybridSearchError::UnknownRelationshipType(t)
            }
            other => HybridSearchError::Backend {
                stage,
                message: other.to_string(),
            },
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Per-stage timeouts; `None` disables the timeout for that stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    /// Query embedding
    pub embed: Option<Duration>,
    /// Lexical retrieval
    pub lexical: Option<Duration>,
    /// Vector retrieval
    pub vector: Option<Duration>,
    /// Graph expansion
    pub graph: Option<Duration>,
    /// Entity lookup for display fields
    pub lookup: Option<Duration>,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            embed: Some(Duration::from_secs(10)),
            lexical: Some(Duration::from_secs(5)),
            vector: Some(Duration::from_secs(5)),
            graph: Some(Duration::from_secs(5)),
            lookup: Some(Duration::from_secs(5)),
        }
    }
}

impl StageTimeouts {
    /// No timeouts at all
    pub fn none() -> Self {
        Self {
            embed: None,
            lexical: None,
            vector: None,
            graph: None,
            lookup: None,
        }
    }

    fn for_stage(&self, stage: Stage) -> Option<Duration> {
        match stage {
            Stage::Embed => self.embed,
            Stage::Lexical => self.lexical,
            Stage::Vector => self.vector,
            Stage::Graph => self.graph,
            Stage::Lookup => self.lookup,
        }
    }
}

/// Configuration for hybrid search
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSearchConfig {
    /// RRF constant (higher = flatter weighting across ranks)
    pub rrf_k: f64,
    /// Limits used when a request does not set its own
    pub limits: SearchLimits,
    /// Graph expansion depth (0 disables expansion)
    pub traversal_depth: usize,
    /// Expansion hit weighting
    pub expansion: ExpansionScoring,
    /// Per-stage timeouts
    pub timeouts: StageTimeouts,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            limits: SearchLimits::default(),
            traversal_depth: 1,
            expansion: ExpansionScoring::default(),
            timeouts: StageTimeouts::default(),
        }
    }
}

impl HybridSearchConfig {
    /// Check the config is usable
    pub fn validate(&self) -> Result<(), HybridSearchError> {
        if !self.rrf_k.is_finite() || self.rrf_k < 0.0 {
            return Err(HybridSearchError::InvalidLimits(format!(
                "rrf_k must be a non-negative number, got {}",
                self.rrf_k
            )));
        }
        self.limits
            .validate()
            .map_err(HybridSearchError::InvalidLimits)
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// One hybrid query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Raw query text
    pub query: String,
    /// Limits; the searcher's defaults when `None`
    pub limits: Option<SearchLimits>,
    /// Which signals to use
    pub mode: SearchMode,
    /// Expansion depth; the searcher's default when `None`
    pub depth: Option<usize>,
    /// Relationship types to follow during expansion; all when `None`
    pub edge_types: Option<Vec<String>>,
}

impl SearchRequest {
    /// Hybrid request with default limits and depth
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limits: None,
            mode: SearchMode::Hybrid,
            depth: None,
            edge_types: None,
        }
    }

    /// Set limits
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Set the search mode
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the expansion depth
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Restrict expansion to the given relationship types
    pub fn with_edge_types(mut self, edge_types: Vec<String>) -> Self {
        self.edge_types = Some(edge_types);
        self
    }
}

// ============================================================================
// BACKENDS
// ============================================================================

/// Collaborators injected into the searcher
#[derive(Clone)]
pub struct SearchBackends {
    /// Query embedding
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Lexical index
    pub lexical: Arc<dyn LexicalBackend>,
    /// Vector index
    pub vector: Arc<dyn VectorBackend>,
    /// Relationship graph
    pub graph: Arc<dyn GraphBackend>,
    /// Display-field lookup
    pub entities: Arc<dyn EntityLookup>,
}

impl SearchBackends {
    /// Every index served by one SQLite store
    pub fn from_storage(storage: Arc<Storage>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let backend = Arc::new(StorageBackend::new(storage));
        Self {
            embedder,
            lexical: backend.clone(),
            vector: backend.clone(),
            graph: backend.clone(),
            entities: backend,
        }
    }
}

// ============================================================================
// HYBRID SEARCHER
// ============================================================================

/// Hybrid query orchestrator
pub struct HybridSearcher {
    backends: SearchBackends,
    config: HybridSearchConfig,
}

impl HybridSearcher {
    /// Create a searcher
    ///
    /// Fails when the embedder's dimensionality differs from an already
    /// built vector index, or the config is unusable.
    pub fn new(
        backends: SearchBackends,
        config: HybridSearchConfig,
    ) -> Result<Self, HybridSearchError> {
        config.validate()?;

        if let Some(expected) = backends.vector.dimensions() {
            let got = backends.embedder.dimensions();
            if expected != got {
                return Err(HybridSearchError::DimensionMismatch { expected, got });
            }
        }

        Ok(Self { backends, config })
    }

    /// Get current configuration
    pub fn config(&self) -> &HybridSearchConfig {
        &self.config
    }

    /// Run `query` with explicit limits in hybrid mode
    pub async fn hybrid_search(
        &self,
        query: &str,
        limits: SearchLimits,
    ) -> Result<Vec<OrderedResult>, HybridSearchError> {
        self.search(&SearchRequest::new(query).with_limits(limits))
            .await
    }

    /// Run a search request
    pub async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<OrderedResult>, HybridSearchError> {
        let query = request.query.trim();
        if !has_query_terms(query) {
            return Err(HybridSearchError::EmptyQuery);
        }

        let limits = request.limits.unwrap_or(self.config.limits);
        limits.validate().map_err(HybridSearchError::InvalidLimits)?;

        let query_id = Uuid::new_v4();
        let span = tracing::debug_span!("hybrid_search", %query_id, mode = %request.mode);

        async {
            let started = Instant::now();
            let result = self.execute(query, limits, request).await;
            match &result {
                Ok(results) => tracing::debug!(
                    results = results.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query complete"
                ),
                Err(e) => tracing::warn!(error = %e, "Query failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        query: &str,
        limits: SearchLimits,
        request: &SearchRequest,
    ) -> Result<Vec<OrderedResult>, HybridSearchError> {
        let mode = request.mode;

        let lexical_branch = async {
            if mode.uses_lexical() {
                self.lexical_stage(query, limits.lexical_limit).await
            } else {
                Ok(vec![])
            }
        };
        let vector_branch = async {
            if mode.uses_vector() {
                let vector = self.embed_stage(query).await?;
                self.vector_stage(vector, limits.vector_limit).await
            } else {
                Ok(vec![])
            }
        };

        let (lexical, vector) = tokio::try_join!(lexical_branch, vector_branch)?;

        let fused: Vec<FusedHit> = fuse(&lexical, &vector, self.config.rrf_k, limits.fused_limit);
        tracing::debug!(
            lexical = lexical.len(),
            vector = vector.len(),
            fused = fused.len(),
            "Fused ranked lists"
        );

        let depth = request.depth.unwrap_or(self.config.traversal_depth);
        let neighbors = if fused.is_empty() || depth == 0 {
            vec![]
        } else {
            let neighbor_query = NeighborQuery {
                seeds: fused.iter().map(|h| h.entity_id.clone()).collect(),
                depth,
                edge_types: request.edge_types.clone(),
            };
            self.graph_stage(&neighbor_query).await?
        };

        let mut ids: Vec<String> = fused.iter().map(|h| h.entity_id.clone()).collect();
        for neighbor in &neighbors {
            if !ids.contains(&neighbor.node_id) {
                ids.push(neighbor.node_id.clone());
            }
        }
        let entities = if ids.is_empty() {
            Default::default()
        } else {
            self.timed(Stage::Lookup, async {
                self.backends
                    .entities
                    .get_entities(&ids)
                    .await
                    .map_err(|e| HybridSearchError::from_backend(Stage::Lookup, e))
            })
            .await?
        };

        Ok(assemble_results(
            &fused,
            &neighbors,
            &entities,
            self.config.expansion,
        ))
    }

    async fn embed_stage(&self, query: &str) -> Result<Vec<f32>, HybridSearchError> {
        self.timed(Stage::Embed, async {
            self.backends
                .embedder
                .embed(query)
                .await
                .map_err(|e| match e {
                    EmbeddingError::InvalidInput(reason) => HybridSearchError::InvalidQuery(reason),
                    other => HybridSearchError::EmbeddingUnavailable(other.to_string()),
                })
        })
        .await
    }

    async fn lexical_stage(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedHit>, HybridSearchError> {
        let request = LexicalQuery::new(query, limit);
        self.timed(Stage::Lexical, async {
            self.backends
                .lexical
                .search_text(&request)
                .await
                .map_err(|e| HybridSearchError::from_backend(Stage::Lexical, e))
        })
        .await
    }

    async fn vector_stage(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<RankedHit>, HybridSearchError> {
        let request = VectorQuery::new(vector, limit);
        self.timed(Stage::Vector, async {
            self.backends
                .vector
                .search_vector(&request)
                .await
                .map_err(|e| HybridSearchError::from_backend(Stage::Vector, e))
        })
        .await
    }

    async fn graph_stage(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, HybridSearchError> {
        self.timed(Stage::Graph, async {
            self.backends
                .graph
                .neighbors(query)
                .await
                .map_err(|e| HybridSearchError::from_backend(Stage::Graph, e))
        })
        .await
    }

    /// Apply the stage timeout and log the stage duration
    async fn timed<T, F>(&self, stage: Stage, fut: F) -> Result<T, HybridSearchError>
    where
        F: Future<Output = Result<T, HybridSearchError>>,
    {
        let started = Instant::now();
        let result = match self.config.timeouts.for_stage(stage) {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| HybridSearchError::Timeout { stage, after })?,
            None => fut.await,
        };
        tracing::debug!(
            stage = %stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Stage finished"
        );
        result
    }
}

// ============================================================================
// TESTS
// ============================================================================
