//! Breadth-first neighbor expansion
//!
//! Edges are walked in both directions. The visited set starts out holding
//! the seeds, so seeds are never reported and cycles terminate at any depth.
//! A node is reported at the hop where it is first discovered; every edge
//! that reaches it from that same frontier is reported alongside.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Direction, RelationshipEdge};

/// Neighbor lookup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborQuery {
    /// Nodes to expand from
    pub seeds: Vec<String>,
    /// Maximum number of hops (0 returns nothing)
    pub depth: usize,
    /// Only follow these relationship types; `None` or empty follows all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_types: Option<Vec<String>>,
}

impl NeighborQuery {
    /// Query following every relationship type
    pub fn new(seeds: Vec<String>, depth: usize) -> Self {
        Self {
            seeds,
            depth,
            edge_types: None,
        }
    }

    /// Restrict traversal to the given relationship types
    pub fn with_edge_types(mut self, edge_types: Vec<String>) -> Self {
        self.edge_types = Some(edge_types);
        self
    }

    fn allows(&self, relationship_type: &str) -> bool {
        match &self.edge_types {
            Some(types) if !types.is_empty() => types.iter().any(|t| t == relationship_type),
            _ => true,
        }
    }
}

/// One edge through which a node was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neighbor {
    /// Newly reached node
    pub node_id: String,
    /// Node on the frontier side of the edge
    pub via_node_id: String,
    /// Seed whose expansion reached `via_node_id`
    pub seed_id: String,
    /// Relationship label of the edge
    pub relationship_type: String,
    /// Edge direction as seen from `via_node_id`
    pub direction: Direction,
    /// Edge attributes
    pub attributes: Map<String, Value>,
    /// 1-based hop count from the seed set
    pub hop: usize,
}

/// Expand `query.seeds` breadth-first
///
/// `fetch` receives the current frontier and must return every edge with
/// either endpoint in it, in a deterministic order.
pub fn expand_neighbors<F, E>(query: &NeighborQuery, mut fetch: F) -> Result<Vec<Neighbor>, E>
where
    F: FnMut(&[String]) -> Result<Vec<RelationshipEdge>, E>,
{
    let mut visited: HashSet<String> = HashSet::new();
    let mut frontier: Vec<String> = Vec::new();
    // frontier node -> seed it descends from
    let mut roots: HashMap<String, String> = HashMap::new();

    for seed in &query.seeds {
        if visited.insert(seed.clone()) {
            frontier.push(seed.clone());
            roots.insert(seed.clone(), seed.clone());
        }
    }

    let mut neighbors = Vec::new();

    for hop in 1..=query.depth {
        if frontier.is_empty() {
            break;
        }

        let edges = fetch(&frontier)?;
        let on_frontier: HashSet<&str> = frontier.iter().map(String::as_str).collect();

        let mut next_frontier: Vec<String> = Vec::new();
        let mut next_roots: HashMap<String, String> = HashMap::new();

        for edge in &edges {
            if !query.allows(&edge.relationship_type) {
                continue;
            }

            for from in [edge.source_id.as_str(), edge.target_id.as_str()] {
                if !on_frontier.contains(from) {
                    continue;
                }
                let Some((other, direction)) = edge.other_end(from) else {
                    continue;
                };
                if other == from {
                    continue;
                }

                let discovered_now = next_roots.contains_key(other);
                if visited.contains(other) && !discovered_now {
                    continue;
                }

                let seed_id = roots.get(from).cloned().unwrap_or_else(|| from.to_string());
                if !discovered_now {
                    next_frontier.push(other.to_string());
                    next_roots.insert(other.to_string(), seed_id.clone());
                }

                neighbors.push(Neighbor {
                    node_id: other.to_string(),
                    via_node_id: from.to_string(),
                    seed_id,
                    relationship_type: edge.relationship_type.clone(),
                    direction,
                    attributes: edge.attributes.clone(),
                    hop,
                });
            }
        }

        visited.extend(next_frontier.iter().cloned());
        frontier = next_frontier;
        roots = next_roots;
    }

    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn fetch_from(
        edges: &[RelationshipEdge],
    ) -> impl FnMut(&[String]) -> Result<Vec<RelationshipEdge>, Infallible> + '_ {
        move |frontier: &[String]| {
            Ok(edges
                .iter()
                .filter(|e| frontier.contains(&e.source_id) || frontier.contains(&e.target_id))
                .cloned()
                .collect())
        }
    }

    fn ids(neighbors: &[Neighbor]) -> Vec<&str> {
        neighbors.iter().map(|n| n.node_id.as_str()).collect()
    }

    #[test]
    fn test_one_hop_both_directions() {
        let edges = vec![
            RelationshipEdge::new("a", "b", "collaborates_with"),
            RelationshipEdge::new("c", "a", "reports_to"),
            RelationshipEdge::new("b", "d", "works_on"),
        ];
        let query = NeighborQuery::new(vec!["a".to_string()], 1);
        let result = expand_neighbors(&query, fetch_from(&edges)).unwrap();

        assert_eq!(ids(&result), vec!["b", "c"]);
        assert_eq!(result[0].direction, Direction::Outgoing);
        assert_eq!(result[1].direction, Direction::Incoming);
        assert_eq!(result[1].relationship_type, "reports_to");
        assert!(result.iter().all(|n| n.hop == 1 && n.seed_id == "a"));
    }

    #[test]
    fn test_seeds_never_reported() {
        let edges = vec![
            RelationshipEdge::new("a", "b", "collaborates_with"),
            RelationshipEdge::new("b", "c", "collaborates_with"),
        ];
        let query = NeighborQuery::new(vec!["a".to_string(), "b".to_string()], 1);
        let result = expand_neighbors(&query, fetch_from(&edges)).unwrap();

        assert_eq!(ids(&result), vec!["c"]);
        assert_eq!(result[0].via_node_id, "b");
    }

    #[test]
    fn test_depth_zero_returns_nothing() {
        let edges = vec![RelationshipEdge::new("a", "b", "x")];
        let query = NeighborQuery::new(vec!["a".to_string()], 0);
        assert!(expand_neighbors(&query, fetch_from(&edges)).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_terminates_at_any_depth() {
        let edges = vec![
            RelationshipEdge::new("a", "b", "x"),
            RelationshipEdge::new("b", "c", "x"),
            RelationshipEdge::new("c", "a", "x"),
        ];
        let query = NeighborQuery::new(vec!["a".to_string()], 50);
        let result = expand_neighbors(&query, fetch_from(&edges)).unwrap();

        // b and c are both one hop from a (c via the incoming c->a edge)
        assert_eq!(ids(&result), vec!["b", "c"]);
        assert!(result.iter().all(|n| n.hop == 1));
    }

    #[test]
    fn test_multiple_connections_same_frontier() {
        let edges = vec![
            RelationshipEdge::new("a", "x", "works_on"),
            RelationshipEdge::new("b", "x", "works_on"),
        ];
        let query = NeighborQuery::new(vec!["a".to_string(), "b".to_string()], 1);
        let result = expand_neighbors(&query, fetch_from(&edges)).unwrap();

        assert_eq!(ids(&result), vec!["x", "x"]);
        assert_eq!(result[0].via_node_id, "a");
        assert_eq!(result[1].via_node_id, "b");
    }

    #[test]
    fn test_second_hop_keeps_seed() {
        let edges = vec![
            RelationshipEdge::new("a", "b", "x"),
            RelationshipEdge::new("b", "c", "y"),
        ];
        let query = NeighborQuery::new(vec!["a".to_string()], 2);
        let result = expand_neighbors(&query, fetch_from(&edges)).unwrap();

        assert_eq!(ids(&result), vec!["b", "c"]);
        assert_eq!(result[1].hop, 2);
        assert_eq!(result[1].via_node_id, "b");
        assert_eq!(result[1].seed_id, "a");
    }

    #[test]
    fn test_edge_type_filter() {
        let edges = vec![
            RelationshipEdge::new("a", "b", "collaborates_with"),
            RelationshipEdge::new("a", "c", "reports_to"),
        ];
        let query = NeighborQuery::new(vec!["a".to_string()], 1)
            .with_edge_types(vec!["reports_to".to_string()]);
        let result = expand_neighbors(&query, fetch_from(&edges)).unwrap();
        assert_eq!(ids(&result), vec!["c"]);
    }

    #[test]
    fn test_self_loop_ignored() {
        let edges = vec![RelationshipEdge::new("a", "a", "x")];
        let query = NeighborQuery::new(vec!["a".to_string()], 1);
        assert!(expand_neighbors(&query, fetch_from(&edges)).unwrap().is_empty());
    }
}
