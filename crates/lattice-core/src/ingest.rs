//! Offline corpus ingestion
//!
//! Reads a corpus file, embeds every entity that arrives without a vector,
//! and loads the lot into storage in one transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::model::{Entity, RelationshipEdge};
use crate::search::has_query_terms;
use crate::storage::{IngestBatch, IngestSummary, Storage, StorageError};

/// Texts sent to the embedder per call
pub const DEFAULT_EMBED_BATCH: usize = 32;

/// Ingestion error
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Corpus file could not be read
    #[error("Failed to read corpus {path}: {source}")]
    Read {
        /// Corpus path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Corpus file is not valid corpus JSON
    #[error("Failed to parse corpus {path}: {source}")]
    Parse {
        /// Corpus path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// Embedding provider failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Storage rejected the batch
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Blocking storage task panicked or was cancelled
    #[error("Ingestion task failed: {0}")]
    Task(String),
}

/// A corpus to index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// Relationship labels used by the edges
    #[serde(default, alias = "relationshipTypes")]
    pub relationship_types: Vec<String>,
    /// Entities
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Directed typed edges
    #[serde(default)]
    pub relationships: Vec<RelationshipEdge>,
}

impl Corpus {
    /// Parse a corpus JSON file
    pub fn from_file(path: &Path) -> Result<Self, IngestError> {
        let contents = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| IngestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Outcome of one ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Entities stored
    pub entities: usize,
    /// Edges stored
    pub edges: usize,
    /// Entities embedded during this ingestion
    pub embedded: usize,
    /// Entities stored without a vector (no words in the body, no vector supplied)
    pub skipped_embeddings: usize,
    /// What storage wrote
    pub summary: IngestSummary,
    /// Wall time
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Loads corpora into storage
pub struct Ingestor {
    storage: Arc<Storage>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Ingestor {
    /// Create an ingestor
    pub fn new(storage: Arc<Storage>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            storage,
            embedder,
            batch_size: DEFAULT_EMBED_BATCH,
        }
    }

    /// Override the embedding batch size (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Replace the existing index with `corpus`
    ///
    /// Embedding happens first and the swap is one transaction, so a failed
    /// rebuild leaves the previous index in place.
    pub async fn rebuild(&self, corpus: Corpus) -> Result<IngestReport, IngestError> {
        self.load(corpus, true).await
    }

    /// Embed missing vectors and store the corpus
    ///
    /// Nothing is stored if embedding or validation fails.
    pub async fn ingest(&self, corpus: Corpus) -> Result<IngestReport, IngestError> {
        self.load(corpus, false).await
    }

    async fn load(&self, corpus: Corpus, replace: bool) -> Result<IngestReport, IngestError> {
        let started = Instant::now();
        let Corpus {
            relationship_types,
            mut entities,
            relationships,
        } = corpus;

        let mut pending = Vec::new();
        let mut skipped = 0;
        for (i, entity) in entities.iter().enumerate() {
            if entity.vector.is_some() {
                continue;
            }
            if !has_query_terms(&entity.body) {
                tracing::warn!(
                    entity_id = %entity.id,
                    "Entity body has no words; stored without a vector"
                );
                skipped += 1;
            } else {
                pending.push(i);
            }
        }

        for chunk in pending.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|&i| entities[i].body.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != chunk.len() {
                return Err(IngestError::Embedding(EmbeddingError::EmbeddingFailed(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    vectors.len()
                ))));
            }
            for (&i, vector) in chunk.iter().zip(vectors) {
                entities[i].vector = Some(vector);
            }
            tracing::debug!(batch = chunk.len(), "Embedded batch");
        }

        let embedded = pending.len();
        let batch = IngestBatch {
            relationship_types,
            entities,
            relationships,
            embedding_model: (embedded > 0).then(|| self.embedder.model_name().to_string()),
            replace,
        };

        let summary = self
            .blocking(move |storage| storage.ingest_batch(batch))
            .await?;

        let report = IngestReport {
            entities: summary.entities,
            edges: summary.relationships,
            embedded,
            skipped_embeddings: skipped,
            summary,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            entities = report.entities,
            edges = report.edges,
            embedded = report.embedded,
            replace,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Corpus ingested"
        );
        Ok(report)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, IngestError>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T, StorageError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || f(storage.as_ref()))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?
            .map_err(IngestError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::search::{IndexKind, VectorIndexConfig};

    fn ingestor(dimensions: usize) -> (Ingestor, Arc<Storage>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = VectorIndexConfig {
            kind: IndexKind::Exact,
            ..VectorIndexConfig::with_dimensions(dimensions)
        };
        let storage =
            Arc::new(Storage::with_config(Some(dir.path().join("test.db")), config).unwrap());
        let ingestor = Ingestor::new(storage.clone(), Arc::new(HashingEmbedder::new(dimensions)))
            .with_batch_size(2);
        (ingestor, storage, dir)
    }

    fn corpus() -> Corpus {
        serde_json::from_str(
            r#"{
                "relationship_types": ["collaborates_with", "works_on"],
                "entities": [
                    {"id": "person:alice", "body": "vector databases and retrieval", "attributes": {"name": "Alice"}},
                    {"id": "person:bob", "body": "neural embeddings for search"},
                    {"id": "person:carol", "body": "compilers"},
                    {"id": "person:empty", "body": "  "},
                    {"id": "person:rule", "body": "---"}
                ],
                "relationships": [
                    {"source": "person:alice", "target": "person:bob", "type": "collaborates_with"},
                    {"source": "person:bob", "target": "project:atlas", "type": "works_on", "attributes": {"role": "lead"}}
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_embeds_missing_vectors() {
        let (ingestor, storage, _dir) = ingestor(16);
        let report = ingestor.ingest(corpus()).await.unwrap();

        assert_eq!(report.entities, 5);
        assert_eq!(report.edges, 2);
        assert_eq!(report.embedded, 3);
        assert_eq!(report.skipped_embeddings, 2);

        let stats = storage.stats().unwrap();
        assert_eq!(stats.entities_with_vectors, 3);
        assert_eq!(stats.dimensions, Some(16));
        assert_eq!(stats.embedding_model.as_deref(), Some("feature-hashing"));
    }

    #[tokio::test]
    async fn test_supplied_vectors_kept() {
        let (ingestor, storage, _dir) = ingestor(2);
        let corpus = Corpus {
            entities: vec![Entity::new("doc:a", "alpha").with_vector(vec![0.6, 0.8])],
            ..Corpus::default()
        };
        let report = ingestor.ingest(corpus).await.unwrap();
        assert_eq!(report.embedded, 0);

        let stored = storage.get_entity("doc:a").unwrap().unwrap();
        assert_eq!(stored.vector, Some(vec![0.6, 0.8]));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_index() {
        let (ingestor, storage, _dir) = ingestor(16);
        ingestor.ingest(corpus()).await.unwrap();

        // Re-ingesting the same ids fails; rebuilding succeeds
        assert!(matches!(
            ingestor.ingest(corpus()).await,
            Err(IngestError::Storage(StorageError::DuplicateEntity(_)))
        ));
        ingestor.rebuild(corpus()).await.unwrap();
        assert_eq!(storage.stats().unwrap().total_entities, 5);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_index() {
        let (ingestor, storage, _dir) = ingestor(16);
        ingestor.ingest(corpus()).await.unwrap();

        let mut broken = corpus();
        broken
            .relationships
            .push(RelationshipEdge::new("person:alice", "person:carol", "undeclared"));
        assert!(matches!(
            ingestor.rebuild(broken).await,
            Err(IngestError::Storage(StorageError::UnknownRelationshipType(_)))
        ));

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_entities, 5);
        assert_eq!(stats.total_relationships, 2);
        assert_eq!(storage.dimensions(), Some(16));
    }

    #[tokio::test]
    async fn test_embedding_outage_during_rebuild_keeps_previous_index() {
        struct DownEmbedder;

        #[async_trait::async_trait]
        impl EmbeddingProvider for DownEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
                Err(EmbeddingError::ModelInit("model unavailable".to_string()))
            }

            fn dimensions(&self) -> usize {
                16
            }

            fn model_name(&self) -> &str {
                "down"
            }
        }

        let (ingestor, storage, _dir) = ingestor(16);
        ingestor.ingest(corpus()).await.unwrap();

        let down = Ingestor::new(storage.clone(), Arc::new(DownEmbedder));
        assert!(matches!(
            down.rebuild(corpus()).await,
            Err(IngestError::Embedding(EmbeddingError::ModelInit(_)))
        ));

        assert_eq!(storage.stats().unwrap().total_entities, 5);
        assert!(storage.get_entity("person:alice").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_relationship_type_rejected() {
        let (ingestor, storage, _dir) = ingestor(16);
        let mut corpus = corpus();
        corpus.relationship_types.retain(|t| t != "works_on");

        let err = ingestor.ingest(corpus).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Storage(StorageError::UnknownRelationshipType(_))
        ));
        assert_eq!(storage.stats().unwrap().total_entities, 0);
    }

    #[test]
    fn test_corpus_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, serde_json::to_string(&corpus()).unwrap()).unwrap();

        let loaded = Corpus::from_file(&path).unwrap();
        assert_eq!(loaded, corpus());

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            Corpus::from_file(&path),
            Err(IngestError::Parse { .. })
        ));
    }
}
