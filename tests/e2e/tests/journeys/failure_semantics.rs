//! Journey: failures are typed and never look like empty results
//!
//! Input errors are rejected before any backend call, unavailable backends
//! fail the query with the stage named, and schema errors are caught at
//! ingestion or construction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lattice_core::search::{BackendError, LexicalBackend, LexicalQuery};
use lattice_core::{
    Corpus, Entity, HybridSearchConfig, HybridSearchError, HybridSearcher, IngestError, Ingestor,
    RankedHit, RelationshipEdge, SearchBackends, SearchLimits, SearchMode, SearchRequest, Stage,
    StageTimeouts, StorageError,
};
use lattice_e2e_tests::harness::TestIndex;
use lattice_e2e_tests::mocks::fixtures::{self, DIMENSIONS, EXPERT_QUERY};
use lattice_e2e_tests::mocks::{FailingEmbedder, FixedEmbedder, SlowEmbedder};

struct UnreachableLexical;

#[async_trait]
impl LexicalBackend for UnreachableLexical {
    async fn search_text(&self, _query: &LexicalQuery) -> Result<Vec<RankedHit>, BackendError> {
        Err(BackendError::Unavailable("connection reset".to_string()))
    }
}

fn seeded() -> TestIndex {
    TestIndex::seeded(DIMENSIONS, fixtures::expertise_corpus())
}

// ============================================================================
// INPUT ERRORS
// ============================================================================

#[tokio::test]
async fn test_blank_query_rejected_before_embedding() {
    let index = seeded();
    let embedder = Arc::new(FixedEmbedder::new(fixtures::query_vector()));
    let searcher = index.searcher(embedder.clone());

    let err = searcher
        .hybrid_search(" \t ", SearchLimits::default())
        .await
        .unwrap_err();

    assert_eq!(err, HybridSearchError::EmptyQuery);
    assert!(!err.is_retryable());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_punctuation_only_query_rejected_before_embedding() {
    let index = seeded();
    let embedder = Arc::new(FixedEmbedder::new(fixtures::query_vector()));
    let searcher = index.searcher(embedder.clone());

    let err = searcher
        .hybrid_search("?!", SearchLimits::default())
        .await
        .unwrap_err();

    assert_eq!(err, HybridSearchError::EmptyQuery);
    assert!(!err.is_retryable());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_zero_limit_rejected() {
    let index = seeded();
    let searcher = index.searcher(Arc::new(FixedEmbedder::new(fixtures::query_vector())));

    let err = searcher
        .hybrid_search(EXPERT_QUERY, SearchLimits::new(10, 0, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, HybridSearchError::InvalidLimits(_)));
}

// ============================================================================
// BACKEND UNAVAILABILITY
// ============================================================================

#[tokio::test]
async fn test_embedding_failure_fails_hybrid_query() {
    let index = seeded();
    let searcher = index.searcher(Arc::new(FailingEmbedder::new(DIMENSIONS)));

    let err = searcher
        .hybrid_search(EXPERT_QUERY, SearchLimits::default())
        .await
        .unwrap_err();

    assert!(matches!(err, HybridSearchError::EmbeddingUnavailable(_)));
    assert_eq!(err.stage(), Some(Stage::Embed));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_lexical_mode_survives_embedding_outage() {
    let index = seeded();
    let searcher = index.searcher(Arc::new(FailingEmbedder::new(DIMENSIONS)));

    let request = SearchRequest::new(EXPERT_QUERY).with_mode(SearchMode::Lexical);
    let results = searcher.search(&request).await.unwrap();
    assert_eq!(results[0].entity_id, "person:e");
}

#[tokio::test]
async fn test_lexical_outage_names_stage() {
    let index = seeded();
    let mut backends = SearchBackends::from_storage(
        index.storage.clone(),
        Arc::new(FixedEmbedder::new(fixtures::query_vector())),
    );
    backends.lexical = Arc::new(UnreachableLexical);
    let searcher = HybridSearcher::new(backends, HybridSearchConfig::default()).unwrap();

    let err = searcher
        .hybrid_search(EXPERT_QUERY, SearchLimits::default())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Lexical));
    assert!(matches!(err, HybridSearchError::Backend { .. }));
}

#[tokio::test]
async fn test_slow_embedding_times_out() {
    let index = seeded();
    let config = HybridSearchConfig {
        timeouts: StageTimeouts {
            embed: Some(Duration::from_millis(50)),
            ..StageTimeouts::none()
        },
        ..HybridSearchConfig::default()
    };
    let embedder = Arc::new(SlowEmbedder::new(
        fixtures::query_vector(),
        Duration::from_secs(10),
    ));
    let searcher = index.try_searcher(embedder, config).unwrap();

    let err = searcher
        .hybrid_search(EXPERT_QUERY, SearchLimits::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        HybridSearchError::Timeout {
            stage: Stage::Embed,
            after: Duration::from_millis(50),
        }
    );
}

// ============================================================================
// SCHEMA ERRORS
// ============================================================================

#[test]
fn test_embedder_dimension_mismatch_rejected_at_construction() {
    let index = seeded();
    let result = index.try_searcher(
        Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0, 0.0])),
        HybridSearchConfig::default(),
    );

    match result {
        Err(HybridSearchError::DimensionMismatch { expected, got }) => {
            assert_eq!(expected, 3);
            assert_eq!(got, 4);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("searcher accepted a 4-dimensional embedder"),
    }
}

#[test]
fn test_wrong_length_vector_rejected_at_ingestion() {
    let index = seeded();
    let corpus = Corpus {
        entities: vec![Entity::new("person:z", "Zed").with_vector(vec![1.0, 0.0])],
        ..Corpus::default()
    };

    let err = index.load(corpus).unwrap_err();
    assert!(matches!(
        err,
        StorageError::DimensionMismatch {
            expected: 3,
            got: 2,
            ..
        }
    ));
    assert_eq!(index.entity_count(), 5);
}

#[test]
fn test_duplicate_entities_rejected() {
    let index = seeded();
    let err = index.load(fixtures::expertise_corpus()).unwrap_err();
    assert!(matches!(err, StorageError::DuplicateEntity(_)));
    assert_eq!(index.entity_count(), 5);
}

#[test]
fn test_undeclared_relationship_type_rejected() {
    let index = seeded();
    let corpus = Corpus {
        relationships: vec![RelationshipEdge::new("person:e", "person:f", "mentors")],
        ..Corpus::default()
    };

    let err = index.load(corpus).unwrap_err();
    assert!(matches!(err, StorageError::UnknownRelationshipType(t) if t == "mentors"));
}

#[test]
fn test_edge_from_unknown_entity_rejected() {
    let index = seeded();
    let corpus = Corpus {
        relationships: vec![RelationshipEdge::new(
            "person:nobody",
            "person:e",
            "collaborates_with",
        )],
        ..Corpus::default()
    };

    assert!(matches!(
        index.load(corpus),
        Err(StorageError::UnknownSource(_))
    ));
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_index() {
    let index = seeded();
    let ingestor = Ingestor::new(
        index.storage.clone(),
        Arc::new(FailingEmbedder::new(DIMENSIONS)),
    );

    let err = ingestor
        .rebuild(fixtures::unembedded_corpus())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Embedding(_)));
    assert_eq!(index.entity_count(), 5);

    let mut broken = fixtures::expertise_corpus();
    broken
        .relationships
        .push(RelationshipEdge::new("person:e", "person:g", "mentors"));
    let err = ingestor.rebuild(broken).await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Storage(StorageError::UnknownRelationshipType(_))
    ));
    assert_eq!(index.entity_count(), 5);

    let searcher = index.searcher(Arc::new(FixedEmbedder::new(fixtures::query_vector())));
    let results = searcher
        .hybrid_search(EXPERT_QUERY, SearchLimits::new(20, 3, 3))
        .await
        .unwrap();
    assert_eq!(results[0].entity_id, "person:e");
}

#[tokio::test]
async fn test_unknown_type_filter_is_schema_error() {
    let index = seeded();
    let searcher = index.searcher(Arc::new(FixedEmbedder::new(fixtures::query_vector())));

    let request = SearchRequest::new(EXPERT_QUERY).with_edge_types(vec!["mentors".to_string()]);
    let err = searcher.search(&request).await.unwrap_err();

    assert_eq!(
        err,
        HybridSearchError::UnknownRelationshipType("mentors".to_string())
    );
    assert!(!err.is_retryable());
}
