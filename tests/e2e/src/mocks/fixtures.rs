//! Fixture corpora
//!
//! Vectors are three-dimensional and hand-placed so the vector ranking for
//! [`query_vector`] is known: F, G, E, then H and I.

use lattice_core::{Corpus, Entity, RelationshipEdge};

/// Vector dimensionality of the fixtures
pub const DIMENSIONS: usize = 3;

/// Query whose terms appear literally only in `person:e`
pub const EXPERT_QUERY: &str = "neural embeddings expert";

/// Query vector for every fixture query
pub fn query_vector() -> Vec<f32> {
    vec![1.0, 0.0, 0.0]
}

fn person(id: &str, name: &str, body: &str, vector: [f32; 3]) -> Entity {
    Entity::new(id, body)
        .with_vector(vector.to_vec())
        .with_attribute("name", name)
}

/// People with expertise descriptions and collaboration edges
///
/// - E mentions "neural embeddings" but sits far from the query vector
/// - F and G sit close to the query vector without the query terms
/// - H is reachable only from E, I only from F, `project:atlas` only from G
pub fn expertise_corpus() -> Corpus {
    Corpus {
        relationship_types: vec!["collaborates_with".to_string(), "works_on".to_string()],
        entities: vec![
            person(
                "person:e",
                "Elena",
                "Research on neural embeddings for search ranking",
                [0.3, 0.95, 0.0],
            ),
            person(
                "person:f",
                "Farid",
                "Dense retrieval models and representation learning",
                [0.95, 0.31, 0.0],
            ),
            person(
                "person:g",
                "Grace",
                "Semantic similarity with transformer encoders",
                [0.9, 0.0, 0.43],
            ),
            person(
                "person:h",
                "Hiro",
                "Distributed systems and consensus protocols",
                [0.0, 0.0, 1.0],
            ),
            person(
                "person:i",
                "Ines",
                "Frontend accessibility audits",
                [0.0, 1.0, 0.0],
            ),
        ],
        relationships: vec![
            RelationshipEdge::new("person:e", "person:h", "collaborates_with"),
            RelationshipEdge::new("person:i", "person:f", "collaborates_with"),
            RelationshipEdge::new("person:g", "project:atlas", "works_on")
                .with_attribute("role", "lead"),
        ],
    }
}

/// [`expertise_corpus`] plus an edge between two entities that are both
/// direct hits for [`EXPERT_QUERY`]
pub fn overlapping_corpus() -> Corpus {
    let mut corpus = expertise_corpus();
    corpus
        .relationships
        .push(RelationshipEdge::new("person:e", "person:f", "collaborates_with"));
    corpus
}

/// Entities without vectors, for ingestion through an embedder
pub fn unembedded_corpus() -> Corpus {
    let mut corpus = expertise_corpus();
    for entity in &mut corpus.entities {
        entity.vector = None;
    }
    corpus
}
