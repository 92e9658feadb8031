//! Entity and Relationship Edge - the units the index is built from
//!
//! Each entity carries:
//! - A stable identifier, optionally namespaced (`person:alice`, `project:atlas`)
//! - Free-text body used for both lexical indexing and embedding
//! - A dense vector of the index dimensionality
//! - Display-only scalar attributes
//!
//! Edges are directed and typed. An edge may point at a node outside the
//! entity set; the namespace prefix tells the node kinds apart.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between an id's namespace and its local part
pub const NAMESPACE_SEPARATOR: char = ':';

/// Namespace prefix of an id (`person:alice` -> `person`)
///
/// Returns `None` when the id has no prefix or the prefix is empty.
pub fn namespace(id: &str) -> Option<&str> {
    match id.split_once(NAMESPACE_SEPARATOR) {
        Some((ns, rest)) if !ns.is_empty() && !rest.is_empty() => Some(ns),
        _ => None,
    }
}

// ============================================================================
// ENTITY
// ============================================================================

/// A searchable entity (person, article, document chunk, ...)
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Unique, stable identifier
    pub id: String,
    /// Text used for lexical indexing and embedding
    pub body: String,
    /// Dense vector; filled in by the embedding provider at ingestion when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Display-only attributes, never used for scoring
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    /// Create an entity without a vector or attributes
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            vector: None,
            attributes: Map::new(),
        }
    }

    /// Attach a precomputed vector
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Attach a display attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Namespace of this entity's id
    pub fn kind(&self) -> Option<&str> {
        namespace(&self.id)
    }
}

// ============================================================================
// RELATIONSHIP EDGE
// ============================================================================

/// A directed, typed edge between two nodes
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdge {
    /// Source node id (must be an entity)
    #[serde(alias = "source")]
    pub source_id: String,
    /// Target node id (may live in another namespace, e.g. `project:atlas`)
    #[serde(alias = "target")]
    pub target_id: String,
    /// Relationship label, e.g. "reports_to", "collaborates_with", "works_on"
    #[serde(alias = "type")]
    pub relationship_type: String,
    /// Optional edge attributes (role, project label, ...)
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl RelationshipEdge {
    /// Create an edge without attributes
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type: relationship_type.into(),
            attributes: Map::new(),
        }
    }

    /// Attach an edge attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The node on the other side of this edge from `node_id`, with the
    /// direction of the edge as seen from `node_id`
    pub fn other_end(&self, node_id: &str) -> Option<(&str, Direction)> {
        if self.source_id == node_id {
            Some((self.target_id.as_str(), Direction::Outgoing))
        } else if self.target_id == node_id {
            Some((self.source_id.as_str(), Direction::Incoming))
        } else {
            None
        }
    }
}

/// Direction of an edge relative to the node it was reached from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// seed -> neighbor
    Outgoing,
    /// neighbor -> seed
    Incoming,
}

impl Direction {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
