//! Test Index Manager
//!
//! Provides isolated index instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded indexes from fixture corpora
//! - Reopening the same database to check persistence

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lattice_core::search::{IndexKind, VectorIndexConfig};
use lattice_core::{
    Corpus, EmbeddingProvider, HybridSearchConfig, HybridSearchError, HybridSearcher,
    IngestBatch, IngestSummary, SearchBackends, Storage, StorageError,
};
use tempfile::TempDir;

/// Manager for test indexes
///
/// Each instance owns its own temporary directory, deleted on drop.
///
/// # Example
///
/// ```rust,ignore
/// let index = TestIndex::seeded(3, fixtures::expertise_corpus());
/// let searcher = index.searcher(Arc::new(FixedEmbedder::new(fixtures::query_vector())));
/// ```
pub struct TestIndex {
    /// The storage instance
    pub storage: Arc<Storage>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: TempDir,
    db_path: PathBuf,
    config: VectorIndexConfig,
}

impl TestIndex {
    /// Empty index using exact vector search over `dimensions`-length vectors
    pub fn new(dimensions: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_lattice.db");
        let config = VectorIndexConfig {
            kind: IndexKind::Exact,
            ..VectorIndexConfig::with_dimensions(dimensions)
        };
        let storage = Storage::with_config(Some(db_path.clone()), config.clone())
            .expect("Failed to create test storage");

        Self {
            storage: Arc::new(storage),
            _temp_dir: temp_dir,
            db_path,
            config,
        }
    }

    /// Index pre-loaded with `corpus`
    pub fn seeded(dimensions: usize, corpus: Corpus) -> Self {
        let index = Self::new(dimensions);
        index.load(corpus).expect("Failed to seed test index");
        index
    }

    /// Load a corpus whose entities already carry vectors
    pub fn load(&self, corpus: Corpus) -> Result<IngestSummary, StorageError> {
        self.storage.ingest_batch(IngestBatch {
            relationship_types: corpus.relationship_types,
            entities: corpus.entities,
            relationships: corpus.relationships,
            embedding_model: None,
            replace: false,
        })
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Open a second storage handle on the same database file
    pub fn reopen(&self) -> Storage {
        Storage::with_config(Some(self.db_path.clone()), self.config.clone())
            .expect("Failed to reopen test storage")
    }

    /// Searcher with default configuration
    pub fn searcher(&self, embedder: Arc<dyn EmbeddingProvider>) -> HybridSearcher {
        self.try_searcher(embedder, HybridSearchConfig::default())
            .expect("Failed to create searcher")
    }

    /// Searcher with explicit configuration
    pub fn try_searcher(
        &self,
        embedder: Arc<dyn EmbeddingProvider>,
        config: HybridSearchConfig,
    ) -> Result<HybridSearcher, HybridSearchError> {
        HybridSearcher::new(
            SearchBackends::from_storage(self.storage.clone(), embedder),
            config,
        )
    }

    /// Number of entities stored
    pub fn entity_count(&self) -> i64 {
        self.storage
            .stats()
            .map(|s| s.total_entities)
            .unwrap_or(0)
    }
}
