//! Vector Index
//!
//! Nearest-neighbor search over dense entity embeddings.
//!
//! - Exact brute-force search for small corpora (deterministic, ties broken
//!   by insertion order)
//! - HNSW approximate search via USearch for large corpora (feature
//!   `vector-search`), with `expansion_search` as the recall-vs-latency knob
//! - Cosine similarity by default (magnitude invariant)
//!
//! Every vector, at insert and at query time, must have exactly the
//! configured number of dimensions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::embeddings::{cosine_similarity, dot_product, euclidean_distance};
use crate::model::{rank_hits, RankedHit};

#[cfg(feature = "vector-search")]
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default embedding dimensions (matches the fastembed provider)
pub const DEFAULT_DIMENSIONS: usize = 256;

/// HNSW connectivity parameter (higher = better recall, more memory)
pub const DEFAULT_CONNECTIVITY: usize = 16;

/// HNSW expansion factor for index building
pub const DEFAULT_EXPANSION_ADD: usize = 128;

/// HNSW expansion factor for search (higher = better recall, slower)
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

/// Below this many vectors `IndexKind::Auto` uses exact search
pub const DEFAULT_EXACT_THRESHOLD: usize = 5_000;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Vector search error types
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum VectorSearchError {
    /// Failed to create the index
    IndexCreation(String),
    /// Failed to add a vector
    IndexAdd(String),
    /// Failed to search
    IndexSearch(String),
    /// Dimension mismatch (expected, got)
    InvalidDimensions(usize, usize),
    /// Requested index kind is not compiled in
    Unsupported(String),
}

impl std::fmt::Display for VectorSearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorSearchError::IndexCreation(e) => write!(f, "Index creation failed: {}", e),
            VectorSearchError::IndexAdd(e) => write!(f, "Failed to add vector: {}", e),
            VectorSearchError::IndexSearch(e) => write!(f, "Search failed: {}", e),
            VectorSearchError::InvalidDimensions(expected, got) => {
                write!(f, "Invalid dimensions: expected {}, got {}", expected, got)
            }
            VectorSearchError::Unsupported(e) => write!(f, "Unsupported index: {}", e),
        }
    }
}

impl std::error::Error for VectorSearchError {}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Distance metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity (higher is closer)
    #[default]
    Cosine,
    /// Euclidean distance (lower is closer)
    L2,
    /// Raw dot product (higher is closer)
    InnerProduct,
}

impl DistanceMetric {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::InnerProduct => "inner_product",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Some(DistanceMetric::Cosine),
            "l2" | "euclidean" => Some(DistanceMetric::L2),
            "inner_product" | "ip" | "dot" => Some(DistanceMetric::InnerProduct),
            _ => None,
        }
    }

    /// Whether a higher score means closer
    fn higher_is_closer(&self) -> bool {
        !matches!(self, DistanceMetric::L2)
    }

    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::L2 => euclidean_distance(a, b),
            DistanceMetric::InnerProduct => dot_product(a, b),
        }
    }
}

/// Which index structure to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact below `exact_threshold` vectors, HNSW above (when compiled in)
    #[default]
    Auto,
    /// Brute-force exact search
    Exact,
    /// Approximate HNSW search
    Hnsw,
}

/// Configuration for vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorIndexConfig {
    /// Number of dimensions
    pub dimensions: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Index structure
    pub kind: IndexKind,
    /// Vector count at which `Auto` switches to HNSW
    pub exact_threshold: usize,
    /// HNSW connectivity parameter
    pub connectivity: usize,
    /// Expansion factor for adding vectors
    pub expansion_add: usize,
    /// Expansion factor for searching (recall vs latency)
    pub expansion_search: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            metric: DistanceMetric::Cosine,
            kind: IndexKind::Auto,
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
        }
    }
}

impl VectorIndexConfig {
    /// Config with the given dimensions and defaults elsewhere
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    /// Index kind to build for `count` vectors
    pub fn resolve_kind(&self, count: usize) -> IndexKind {
        match self.kind {
            IndexKind::Auto if count >= self.exact_threshold && cfg!(feature = "vector-search") => {
                IndexKind::Hnsw
            }
            IndexKind::Auto => IndexKind::Exact,
            other => other,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexStats {
    /// Total number of vectors
    pub total_vectors: usize,
    /// Vector dimensions
    pub dimensions: usize,
    /// Resolved index structure
    pub kind: IndexKind,
    /// Distance metric
    pub metric: DistanceMetric,
}

// ============================================================================
// BACKENDS
// ============================================================================

#[derive(Default)]
struct ExactIndex {
    vectors: Vec<Vec<f32>>,
}

#[cfg(feature = "vector-search")]
struct HnswIndex {
    index: Index,
}

#[cfg(feature = "vector-search")]
impl HnswIndex {
    fn new(config: &VectorIndexConfig) -> Result<Self, VectorSearchError> {
        let metric = match config.metric {
            DistanceMetric::Cosine => MetricKind::Cos,
            DistanceMetric::L2 => MetricKind::L2sq,
            DistanceMetric::InnerProduct => MetricKind::IP,
        };
        let options = IndexOptions {
            dimensions: config.dimensions,
            metric,
            quantization: ScalarKind::F32,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };

        let index =
            Index::new(&options).map_err(|e| VectorSearchError::IndexCreation(e.to_string()))?;
        Ok(Self { index })
    }

    /// usearch requires reserve() before add()
    fn ensure_capacity(&self) -> Result<(), VectorSearchError> {
        let capacity = self.index.capacity();
        if self.index.size() >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.index.reserve(new_capacity).map_err(|e| {
                VectorSearchError::IndexCreation(format!("Failed to reserve capacity: {}", e))
            })?;
        }
        Ok(())
    }
}

enum Backend {
    Exact(ExactIndex),
    #[cfg(feature = "vector-search")]
    Hnsw(HnswIndex),
}

// ============================================================================
// VECTOR INDEX
// ============================================================================

/// Nearest-neighbor index keyed by entity id
pub struct VectorIndex {
    backend: Backend,
    config: VectorIndexConfig,
    kind: IndexKind,
    key_to_id: HashMap<String, u64>,
    id_to_key: Vec<String>,
}

impl VectorIndex {
    /// Create an empty index; `Auto` starts out exact
    pub fn new(config: VectorIndexConfig) -> Result<Self, VectorSearchError> {
        Self::with_kind(config, IndexKind::Exact, 0)
    }

    /// Build an index over `entries`, resolving `Auto` by their count
    pub fn build(
        config: VectorIndexConfig,
        entries: Vec<(String, Vec<f32>)>,
    ) -> Result<Self, VectorSearchError> {
        let mut index = Self::with_kind(config, IndexKind::Auto, entries.len())?;
        for (key, vector) in entries {
            index.add(&key, &vector)?;
        }
        Ok(index)
    }

    fn with_kind(
        config: VectorIndexConfig,
        requested: IndexKind,
        count: usize,
    ) -> Result<Self, VectorSearchError> {
        let kind = match (config.kind, requested) {
            (IndexKind::Auto, IndexKind::Exact) => IndexKind::Exact,
            _ => config.resolve_kind(count),
        };

        let backend = match kind {
            IndexKind::Hnsw => {
                #[cfg(feature = "vector-search")]
                {
                    let hnsw = HnswIndex::new(&config)?;
                    if count > 0 {
                        hnsw.index.reserve(count).map_err(|e| {
                            VectorSearchError::IndexCreation(format!(
                                "Failed to reserve capacity: {}",
                                e
                            ))
                        })?;
                    }
                    Backend::Hnsw(hnsw)
                }
                #[cfg(not(feature = "vector-search"))]
                {
                    return Err(VectorSearchError::Unsupported(
                        "HNSW requires the `vector-search` feature".to_string(),
                    ));
                }
            }
            _ => Backend::Exact(ExactIndex::default()),
        };

        Ok(Self {
            backend,
            config,
            kind,
            key_to_id: HashMap::new(),
            id_to_key: Vec::new(),
        })
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.id_to_key.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the dimensions of the index
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Resolved index structure
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Check if a key exists in the index
    pub fn contains(&self, key: &str) -> bool {
        self.key_to_id.contains_key(key)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), VectorSearchError> {
        if vector.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.config.dimensions,
                vector.len(),
            ));
        }
        Ok(())
    }

    /// Add a vector with a string key; re-adding a key replaces its vector
    pub fn add(&mut self, key: &str, vector: &[f32]) -> Result<(), VectorSearchError> {
        self.check_dimensions(vector)?;

        let existing = self.key_to_id.get(key).copied();
        let id = existing.unwrap_or(self.id_to_key.len() as u64);

        match &mut self.backend {
            Backend::Exact(exact) => match existing {
                Some(id) => exact.vectors[id as usize] = vector.to_vec(),
                None => exact.vectors.push(vector.to_vec()),
            },
            #[cfg(feature = "vector-search")]
            Backend::Hnsw(hnsw) => {
                if existing.is_some() {
                    hnsw.index
                        .remove(id)
                        .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
                }
                hnsw.ensure_capacity()?;
                hnsw.index
                    .add(id, vector)
                    .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            }
        }

        if existing.is_none() {
            self.key_to_id.insert(key.to_string(), id);
            self.id_to_key.push(key.to_string());
        }
        Ok(())
    }

    /// Top-`limit` nearest entities, closest first, ranks 1-based
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<RankedHit>, VectorSearchError> {
        self.check_dimensions(query)?;

        if self.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let metric = self.config.metric;
        let mut scored: Vec<(u64, f32)> = match &self.backend {
            Backend::Exact(exact) => exact
                .vectors
                .iter()
                .enumerate()
                .map(|(id, v)| (id as u64, metric.score(query, v)))
                .collect(),
            #[cfg(feature = "vector-search")]
            Backend::Hnsw(hnsw) => {
                let results = hnsw
                    .index
                    .search(query, limit)
                    .map_err(|e| VectorSearchError::IndexSearch(e.to_string()))?;
                results
                    .keys
                    .iter()
                    .zip(results.distances.iter())
                    .map(|(id, distance)| {
                        let score = match metric {
                            DistanceMetric::L2 => distance.max(0.0).sqrt(),
                            _ => 1.0 - distance,
                        };
                        (*id, score)
                    })
                    .collect()
            }
        };

        // Stable order: closest first, then insertion order
        scored.sort_by(|a, b| {
            let by_score = if metric.higher_is_closer() {
                b.1.partial_cmp(&a.1)
            } else {
                a.1.partial_cmp(&b.1)
            };
            by_score
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        Ok(rank_hits(scored.into_iter().filter_map(|(id, score)| {
            self.id_to_key
                .get(id as usize)
                .map(|key| (key.clone(), score))
        })))
    }

    /// Get index statistics
    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            total_vectors: self.len(),
            dimensions: self.config.dimensions,
            kind: self.kind,
            metric: self.config.metric,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
