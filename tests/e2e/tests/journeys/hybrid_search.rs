//! Journey: index a corpus, query it, read provenance
//!
//! Runs the full pipeline against real SQLite storage: FTS5 lexical search,
//! exact vector search, RRF fusion and relationship expansion.

use std::sync::Arc;

use lattice_core::{
    Corpus, Direction, HashingEmbedder, Ingestor, OrderedResult, Provenance, SearchBackends,
    HybridSearchConfig, HybridSearcher, SearchLimits, SearchMode, SearchRequest,
};
use lattice_e2e_tests::harness::TestIndex;
use lattice_e2e_tests::mocks::fixtures::{self, DIMENSIONS, EXPERT_QUERY};
use lattice_e2e_tests::mocks::FixedEmbedder;

fn ids(results: &[OrderedResult]) -> Vec<&str> {
    results.iter().map(|r| r.entity_id.as_str()).collect()
}

fn embedder() -> Arc<FixedEmbedder> {
    Arc::new(FixedEmbedder::new(fixtures::query_vector()))
}

/// Three direct hits, leaving H and I to graph expansion
fn limits() -> SearchLimits {
    SearchLimits::new(20, 3, 3)
}

// ============================================================================
// END-TO-END SCENARIO
// ============================================================================

#[tokio::test]
async fn test_expert_query_fuses_and_expands() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let searcher = index.searcher(embedder());

    let results = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();

    // E: lexical #1 + vector #3; F: vector #1; G: vector #2
    assert_eq!(
        ids(&results),
        vec!["person:e", "person:f", "person:g", "person:h", "person:i", "project:atlas"]
    );

    let e = &results[0];
    assert!((e.score - (1.0 / 61.0 + 1.0 / 63.0)).abs() < 1e-12);
    assert_eq!(
        e.provenance,
        Provenance::Direct {
            lexical_rank: Some(1),
            vector_rank: Some(3),
        }
    );
    assert_eq!(e.display_fields["name"], "Elena");
    assert_eq!(e.kind.as_deref(), Some("person"));

    assert!(results[1].score > results[2].score);
    assert!(results[..3].iter().all(|r| r.provenance.is_direct()));
    assert!(results[3..].iter().all(|r| r.provenance.is_expansion()));

    // H hangs off E, I points at F
    match &results[3].provenance {
        Provenance::Expansion {
            via_relationship_type,
            via_entity_id,
            connections,
        } => {
            assert_eq!(via_relationship_type, "collaborates_with");
            assert_eq!(via_entity_id, "person:e");
            assert_eq!(connections[0].direction, Direction::Outgoing);
        }
        other => panic!("expected expansion, got {:?}", other),
    }
    match &results[4].provenance {
        Provenance::Expansion {
            via_entity_id,
            connections,
            ..
        } => {
            assert_eq!(via_entity_id, "person:f");
            assert_eq!(connections[0].direction, Direction::Incoming);
        }
        other => panic!("expected expansion, got {:?}", other),
    }

    // Foreign-namespace node: no entity record, edge attributes kept
    let atlas = &results[5];
    assert!(atlas.display_fields.is_empty());
    assert_eq!(atlas.kind.as_deref(), Some("project"));
    match &atlas.provenance {
        Provenance::Expansion { connections, .. } => {
            assert_eq!(connections[0].attributes["role"], "lead");
        }
        other => panic!("expected expansion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_results_serialize_with_provenance_tag() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let searcher = index.searcher(embedder());
    let results = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json[0]["entityId"], "person:e");
    assert_eq!(json[0]["provenance"], "direct");
    assert_eq!(json[0]["lexicalRank"], 1);
    assert_eq!(json[0]["vectorRank"], 3);
    assert_eq!(json[1]["lexicalRank"], serde_json::Value::Null);
    assert_eq!(json[3]["provenance"], "expansion");
    assert_eq!(json[3]["viaRelationshipType"], "collaborates_with");
    assert_eq!(json[3]["viaEntityId"], "person:e");
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[tokio::test]
async fn test_repeated_queries_identical() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let searcher = index.searcher(embedder());

    let first = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();
    for _ in 0..5 {
        let again = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();
        assert_eq!(first, again);
    }
}

#[tokio::test]
async fn test_direct_hit_never_repeated_as_expansion() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::overlapping_corpus());
    let searcher = index.searcher(embedder());

    let results = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();

    let f: Vec<&OrderedResult> = results.iter().filter(|r| r.entity_id == "person:f").collect();
    assert_eq!(f.len(), 1);
    assert!(f[0].provenance.is_direct());
}

#[tokio::test]
async fn test_no_lexical_match_keeps_vector_order() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let searcher = index.searcher(embedder());

    let request = SearchRequest::new("quasar")
        .with_limits(SearchLimits::new(20, 2, 2))
        .with_depth(0);
    let results = searcher.search(&request).await.unwrap();

    assert_eq!(ids(&results), vec!["person:f", "person:g"]);
    assert_eq!(results[0].score, 1.0 / 61.0);
    assert_eq!(results[1].score, 1.0 / 62.0);
}

#[tokio::test]
async fn test_edge_type_filter_limits_expansion() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let searcher = index.searcher(embedder());

    let request = SearchRequest::new(EXPERT_QUERY)
        .with_limits(limits())
        .with_edge_types(vec!["works_on".to_string()]);
    let results = searcher.search(&request).await.unwrap();

    assert_eq!(
        ids(&results),
        vec!["person:e", "person:f", "person:g", "project:atlas"]
    );
}

#[tokio::test]
async fn test_lexical_mode_never_embeds() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let embedder = embedder();
    let searcher = index.searcher(embedder.clone());

    let request = SearchRequest::new(EXPERT_QUERY)
        .with_limits(limits())
        .with_mode(SearchMode::Lexical);
    let results = searcher.search(&request).await.unwrap();

    assert_eq!(ids(&results), vec!["person:e", "person:h"]);
    assert_eq!(embedder.calls(), 0);
}

// ============================================================================
// PERSISTENCE AND INGESTION
// ============================================================================

#[tokio::test]
async fn test_reopened_index_answers_identically() {
    let index = TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus());
    let before = index
        .searcher(embedder())
        .hybrid_search(EXPERT_QUERY, limits())
        .await
        .unwrap();

    let reopened = Arc::new(index.reopen());
    let searcher = HybridSearcher::new(
        SearchBackends::from_storage(reopened, embedder()),
        HybridSearchConfig::default(),
    )
    .unwrap();
    let after = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_ingest_then_search_with_hashing_embedder() {
    let index = TestIndex::new(64);
    let embedder = Arc::new(HashingEmbedder::new(64));

    let report = Ingestor::new(index.storage.clone(), embedder.clone())
        .ingest(fixtures::unembedded_corpus())
        .await
        .unwrap();
    assert_eq!(report.entities, 5);
    assert_eq!(report.embedded, 5);
    assert_eq!(report.edges, 3);

    let searcher = index.searcher(embedder);
    let results = searcher
        .hybrid_search("distributed consensus", SearchLimits::new(5, 5, 1))
        .await
        .unwrap();

    // Both signals rank Hiro first; Elena follows through the edge
    assert_eq!(ids(&results), vec!["person:h", "person:e"]);
    assert!(results[1].provenance.is_expansion());
}

#[tokio::test]
async fn test_empty_corpus_returns_nothing() {
    let index = TestIndex::seeded(DIMENSIONS, Corpus::default());
    let searcher = index.searcher(embedder());

    let results = searcher.hybrid_search(EXPERT_QUERY, limits()).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(index.entity_count(), 0);
}
