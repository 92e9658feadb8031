//! Model module - Core types and data structures
//!
//! - Entities and typed relationship edges (ingestion-time data)
//! - Ranked hits and fused hits (per-query, never persisted)
//! - Ordered results with provenance (what a hybrid search returns)

mod entity;

pub use entity::{namespace, Direction, Entity, RelationshipEdge, NAMESPACE_SEPARATOR};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// SEARCH MODE
// ============================================================================

/// Which retrieval signals a query uses
///
/// `Hybrid` never degrades on its own: a failing backend fails the query.
/// The single-signal modes are explicit degraded modes chosen by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Lexical + vector, fused with RRF
    #[default]
    Hybrid,
    /// Lexical (BM25) only; the embedding provider is never called
    Lexical,
    /// Vector only; the lexical index is never queried
    Vector,
}

impl SearchMode {
    /// Whether the lexical index is queried
    pub fn uses_lexical(&self) -> bool {
        matches!(self, SearchMode::Hybrid | SearchMode::Lexical)
    }

    /// Whether the embedding provider and vector index are queried
    pub fn uses_vector(&self) -> bool {
        matches!(self, SearchMode::Hybrid | SearchMode::Vector)
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Hybrid => write!(f, "hybrid"),
            SearchMode::Lexical => write!(f, "lexical"),
            SearchMode::Vector => write!(f, "vector"),
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(SearchMode::Hybrid),
            "lexical" | "keyword" => Ok(SearchMode::Lexical),
            "vector" | "semantic" => Ok(SearchMode::Vector),
            _ => Err(format!("Unknown search mode: {}", s)),
        }
    }
}

// ============================================================================
// LIMITS
// ============================================================================

/// Per-query result limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLimits {
    /// Max hits requested from the lexical index
    pub lexical_limit: usize,
    /// Max hits requested from the vector index
    pub vector_limit: usize,
    /// Max direct hits kept after fusion (the expansion seed set)
    pub fused_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            lexical_limit: 20,
            vector_limit: 20,
            fused_limit: 10,
        }
    }
}

impl SearchLimits {
    /// Create limits
    pub fn new(lexical_limit: usize, vector_limit: usize, fused_limit: usize) -> Self {
        Self {
            lexical_limit,
            vector_limit,
            fused_limit,
        }
    }

    /// Check that every limit is positive
    pub fn validate(&self) -> Result<(), String> {
        if self.lexical_limit == 0 {
            return Err("lexical_limit must be greater than zero".to_string());
        }
        if self.vector_limit == 0 {
            return Err("vector_limit must be greater than zero".to_string());
        }
        if self.fused_limit == 0 {
            return Err("fused_limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// PER-STRATEGY AND FUSED HITS
// ============================================================================

/// One entry of a single strategy's ranked list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedHit {
    /// Entity id
    pub entity_id: String,
    /// 1-based position within the strategy's list
    pub rank: usize,
    /// Backend-native score (BM25, similarity or distance). Display only.
    pub score: f32,
}

impl RankedHit {
    /// Create a ranked hit
    pub fn new(entity_id: impl Into<String>, rank: usize, score: f32) -> Self {
        Self {
            entity_id: entity_id.into(),
            rank,
            score,
        }
    }
}

/// Assign 1-based ranks to an ordered list of (id, score) pairs
pub fn rank_hits<I>(ordered: I) -> Vec<RankedHit>
where
    I: IntoIterator<Item = (String, f32)>,
{
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (entity_id, score))| RankedHit {
            entity_id,
            rank: i + 1,
            score,
        })
        .collect()
}

/// An entity after Reciprocal Rank Fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedHit {
    /// Entity id
    pub entity_id: String,
    /// Sum of 1/(k + rank) over the lists containing the entity
    pub score: f64,
    /// Rank in the lexical list, if present
    pub lexical_rank: Option<usize>,
    /// Rank in the vector list, if present
    pub vector_rank: Option<usize>,
}

// ============================================================================
// ORDERED RESULTS
// ============================================================================

/// One edge through which an expansion hit was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionConnection {
    /// Relationship label of the traversed edge
    pub relationship_type: String,
    /// Node on the other side of the edge (a direct hit at hop 1)
    pub via_entity_id: String,
    /// Direct hit the traversal started from
    pub seed_entity_id: String,
    /// Edge direction relative to `via_entity_id`
    pub direction: Direction,
    /// Traversal depth at which the node was reached
    pub hop: usize,
    /// Edge attributes
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// Why a result is in the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provenance", rename_all = "snake_case")]
pub enum Provenance {
    /// Returned by the lexical and/or vector strategy
    #[serde(rename_all = "camelCase")]
    Direct {
        lexical_rank: Option<usize>,
        vector_rank: Option<usize>,
    },
    /// Reached only by graph traversal from a direct hit
    #[serde(rename_all = "camelCase")]
    Expansion {
        /// Relationship type of the strongest connection
        via_relationship_type: String,
        /// Direct hit of the strongest connection
        via_entity_id: String,
        /// Every connection reaching this node, strongest first
        connections: Vec<ExpansionConnection>,
    },
}

impl Provenance {
    /// Whether this is a direct hit
    pub fn is_direct(&self) -> bool {
        matches!(self, Provenance::Direct { .. })
    }

    /// Whether this is a graph-expansion hit
    pub fn is_expansion(&self) -> bool {
        matches!(self, Provenance::Expansion { .. })
    }
}

/// One entry of a hybrid search answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedResult {
    /// Entity (or foreign node) id
    pub entity_id: String,
    /// Namespace of the id, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Display attributes of the entity; empty for nodes outside the entity set
    pub display_fields: Map<String, Value>,
    /// Fusion score for direct hits, expansion weight otherwise
    pub score: f64,
    /// How this result entered the list
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// Summary statistics of a built index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Number of entities
    pub total_entities: i64,
    /// Number of entities with a stored vector
    pub entities_with_vectors: i64,
    /// Number of relationship edges
    pub total_relationships: i64,
    /// Number of declared relationship types
    pub relationship_types: i64,
    /// Vector dimensionality of the index, once built
    pub dimensions: Option<usize>,
    /// Embedding model recorded at build time
    pub embedding_model: Option<String>,
    /// When the index was last built
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
}
