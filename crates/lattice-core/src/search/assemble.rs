//! Result assembly
//!
//! Direct hits keep their fused order. Graph neighbors become expansion
//! hits, grouped per node so each appears once with every connection that
//! reached it. Expansion hits always follow direct hits.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::graph::Neighbor;
use crate::model::{namespace, Entity, ExpansionConnection, FusedHit, OrderedResult, Provenance};

/// Default score of an expansion hit
pub const DEFAULT_EXPANSION_SCORE: f64 = 0.001;

/// How expansion hits are weighted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionScoring {
    /// Every expansion hit gets the same low score
    Fixed(f64),
    /// Score grows with the number of distinct connecting edges
    EdgeCount {
        /// Score contributed by each connection
        per_edge: f64,
    },
}

impl Default for ExpansionScoring {
    fn default() -> Self {
        ExpansionScoring::Fixed(DEFAULT_EXPANSION_SCORE)
    }
}

impl ExpansionScoring {
    /// Score for a node reached through `connections` edges
    pub fn score(&self, connections: usize) -> f64 {
        match self {
            ExpansionScoring::Fixed(score) => *score,
            ExpansionScoring::EdgeCount { per_edge } => per_edge * connections as f64,
        }
    }
}

/// Build the final ordered list
///
/// `entities` supplies display fields; ids missing from it (nodes outside
/// the entity set) get empty display fields. A neighbor that is already a
/// direct hit is dropped, never demoted.
pub fn assemble_results(
    fused: &[FusedHit],
    neighbors: &[Neighbor],
    entities: &HashMap<String, Entity>,
    scoring: ExpansionScoring,
) -> Vec<OrderedResult> {
    let display = |id: &str| {
        entities
            .get(id)
            .map(|e| e.attributes.clone())
            .unwrap_or_else(Map::new)
    };

    let mut results: Vec<OrderedResult> = fused
        .iter()
        .map(|hit| OrderedResult {
            entity_id: hit.entity_id.clone(),
            kind: namespace(&hit.entity_id).map(str::to_string),
            display_fields: display(&hit.entity_id),
            score: hit.score,
            provenance: Provenance::Direct {
                lexical_rank: hit.lexical_rank,
                vector_rank: hit.vector_rank,
            },
        })
        .collect();

    // Position of each direct hit, used to rank connections
    let seed_position: HashMap<&str, usize> = fused
        .iter()
        .enumerate()
        .map(|(i, hit)| (hit.entity_id.as_str(), i))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Neighbor>> = HashMap::new();
    for neighbor in neighbors {
        if seed_position.contains_key(neighbor.node_id.as_str()) {
            continue;
        }
        let group = groups.entry(neighbor.node_id.as_str()).or_insert_with(|| {
            order.push(neighbor.node_id.as_str());
            Vec::new()
        });
        group.push(neighbor);
    }

    let position_of = |seed: &str| seed_position.get(seed).copied().unwrap_or(usize::MAX);

    let mut expansions: Vec<(OrderedResult, usize)> = order
        .into_iter()
        .filter_map(|node_id| {
            let mut group = groups.remove(node_id)?;
            group.sort_by(|a, b| {
                position_of(&a.seed_id)
                    .cmp(&position_of(&b.seed_id))
                    .then(a.hop.cmp(&b.hop))
                    .then_with(|| a.relationship_type.cmp(&b.relationship_type))
                    .then_with(|| a.via_node_id.cmp(&b.via_node_id))
            });

            let mut seen = HashSet::new();
            let connections: Vec<ExpansionConnection> = group
                .into_iter()
                .filter(|n| {
                    seen.insert((
                        n.via_node_id.as_str(),
                        n.relationship_type.as_str(),
                        n.direction,
                    ))
                })
                .map(|n| ExpansionConnection {
                    relationship_type: n.relationship_type.clone(),
                    via_entity_id: n.via_node_id.clone(),
                    seed_entity_id: n.seed_id.clone(),
                    direction: n.direction,
                    hop: n.hop,
                    attributes: n.attributes.clone(),
                })
                .collect();

            let strongest = connections.first()?;
            let best_seed = position_of(&strongest.seed_entity_id);
            let result = OrderedResult {
                entity_id: node_id.to_string(),
                kind: namespace(node_id).map(str::to_string),
                display_fields: display(node_id),
                score: scoring.score(connections.len()),
                provenance: Provenance::Expansion {
                    via_relationship_type: strongest.relationship_type.clone(),
                    via_entity_id: strongest.via_entity_id.clone(),
                    connections,
                },
            };
            Some((result, best_seed))
        })
        .collect();

    expansions.sort_by(|(a, a_seed), (b, b_seed)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a_seed.cmp(b_seed))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    results.extend(expansions.into_iter().map(|(result, _)| result));
    results
}
