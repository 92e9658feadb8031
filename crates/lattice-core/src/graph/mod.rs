//! Relationship Graph
//!
//! Directed, typed edges over a heterogeneous node set. Nodes of different
//! kinds are told apart by the namespace prefix of their id, and an edge may
//! point at a node that is not a searchable entity (e.g. `project:atlas`).
//!
//! Traversal is shared between the in-memory graph below and the SQLite
//! store: both hand an edge-fetching closure to [`expand_neighbors`].

mod traversal;

pub use traversal::{expand_neighbors, Neighbor, NeighborQuery};

use std::collections::{BTreeSet, HashMap};

use crate::model::RelationshipEdge;

/// Graph error types
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Relationship type was never declared
    #[error("Unknown relationship type: {0}")]
    UnknownRelationshipType(String),
    /// Edge source is not a known entity
    #[error("Edge source not found: {0}")]
    UnknownSource(String),
}

/// In-memory relationship graph with a declared set of relationship types
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    relationship_types: BTreeSet<String>,
    edges: Vec<RelationshipEdge>,
    adjacency: HashMap<String, Vec<usize>>,
}

impl RelationshipGraph {
    /// Create a graph accepting the given relationship types
    pub fn new<I, S>(relationship_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            relationship_types: relationship_types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Declared relationship types
    pub fn relationship_types(&self) -> impl Iterator<Item = &str> {
        self.relationship_types.iter().map(String::as_str)
    }

    /// Whether `relationship_type` was declared
    pub fn has_relationship_type(&self, relationship_type: &str) -> bool {
        self.relationship_types.contains(relationship_type)
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add a directed edge; its type must have been declared
    pub fn add_edge(&mut self, edge: RelationshipEdge) -> Result<(), GraphError> {
        if !self.has_relationship_type(&edge.relationship_type) {
            return Err(GraphError::UnknownRelationshipType(
                edge.relationship_type.clone(),
            ));
        }

        let index = self.edges.len();
        self.adjacency
            .entry(edge.source_id.clone())
            .or_default()
            .push(index);
        if edge.target_id != edge.source_id {
            self.adjacency
                .entry(edge.target_id.clone())
                .or_default()
                .push(index);
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Check a traversal filter against the declared types
    pub fn validate_query(&self, query: &NeighborQuery) -> Result<(), GraphError> {
        if let Some(types) = &query.edge_types {
            if let Some(unknown) = types.iter().find(|t| !self.has_relationship_type(t)) {
                return Err(GraphError::UnknownRelationshipType(unknown.clone()));
            }
        }
        Ok(())
    }

    /// Nodes reachable from the seeds within `query.depth` hops
    pub fn neighbors(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, GraphError> {
        self.validate_query(query)?;

        expand_neighbors(query, |frontier| {
            // Insertion order keeps results deterministic
            let indices: BTreeSet<usize> = frontier
                .iter()
                .filter_map(|id| self.adjacency.get(id))
                .flatten()
                .copied()
                .collect();
            Ok(indices.into_iter().map(|i| self.edges[i].clone()).collect())
        })
    }
}
