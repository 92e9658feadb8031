//! SQLite Storage Implementation
//!
//! Entities, their embeddings and typed relationship edges live in one
//! SQLite file. FTS5 backs lexical search; the vector index is rebuilt in
//! memory from persisted embeddings at open and after every ingestion.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::{expand_neighbors, Neighbor, NeighborQuery};
use crate::model::{rank_hits, Entity, IndexStats, RankedHit, RelationshipEdge};
use crate::search::{
    sanitize_fts5_query, DistanceMetric, VectorIndex, VectorIndexConfig, VectorSearchError,
};

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "lattice.db";

/// Maximum ids bound into one `IN (...)` list
const MAX_IN_PARAMS: usize = 500;

const META_DIMENSIONS: &str = "dimensions";
const META_METRIC: &str = "metric";
const META_EMBEDDING_MODEL: &str = "embedding_model";
const META_BUILT_AT: &str = "built_at";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Attribute (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Malformed ingestion input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Entity vector length differs from the index dimensionality
    #[error("Dimension mismatch for {entity_id}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Offending entity
        entity_id: String,
        /// Index dimensionality
        expected: usize,
        /// Vector length
        got: usize,
    },
    /// Query vector length differs from the index dimensionality
    #[error("Query dimension mismatch: expected {expected}, got {got}")]
    QueryDimensionMismatch {
        /// Index dimensionality
        expected: usize,
        /// Query vector length
        got: usize,
    },
    /// Entity id already present
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),
    /// Edge or filter references an undeclared relationship type
    #[error("Unknown relationship type: {0}")]
    UnknownRelationshipType(String),
    /// Edge source is not an entity
    #[error("Edge source is not an entity: {0}")]
    UnknownSource(String),
    /// Persisted embedding cannot be decoded or has the wrong length
    #[error("Corrupt embedding for {entity_id}: {reason}")]
    CorruptEmbedding {
        /// Entity owning the embedding
        entity_id: String,
        /// What is wrong with it
        reason: String,
    },
    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(#[from] VectorSearchError),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// INGESTION TYPES
// ============================================================================

/// Everything loaded by one ingestion transaction
#[derive(Debug, Clone, Default)]
pub struct IngestBatch {
    /// Relationship labels to declare
    pub relationship_types: Vec<String>,
    /// Entities to insert
    pub entities: Vec<Entity>,
    /// Edges to insert
    pub relationships: Vec<RelationshipEdge>,
    /// Model that produced the vectors, recorded in the index metadata
    pub embedding_model: Option<String>,
    /// Drop everything already stored, in the same transaction
    pub replace: bool,
}

/// Counts of what an ingestion stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Entities inserted
    pub entities: usize,
    /// Embeddings inserted
    pub embeddings: usize,
    /// Edges inserted
    pub relationships: usize,
    /// Relationship types newly declared
    pub relationship_types: usize,
}

// ============================================================================
// STORAGE
// ============================================================================

/// Main storage struct with integrated lexical, vector and graph indexes
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making Storage `Send + Sync` so callers can
/// share an `Arc<Storage>`. The vector index has its own lock, so lexical
/// and vector queries never wait on each other.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    vector_index: RwLock<Option<VectorIndex>>,
    index_config: VectorIndexConfig,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("LATTICE_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA mmap_size = 268435456;
             PRAGMA journal_size_limit = 67108864;",
        )?;

        Ok(())
    }

    /// Default data directory (`LATTICE_DATA_DIR` or the platform data dir)
    pub fn default_data_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("LATTICE_DATA_DIR") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        let proj_dirs = ProjectDirs::from("com", "lattice", "core").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Create new storage instance with the default vector index config
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_config(db_path, VectorIndexConfig::default())
    }

    /// Create new storage instance
    ///
    /// Dimensions and metric recorded by a previous build take precedence
    /// over `index_config`.
    pub fn with_config(db_path: Option<PathBuf>, index_config: VectorIndexConfig) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let data_dir = Self::default_data_dir()?;
                std::fs::create_dir_all(&data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(&data_dir, perms);
                }
                data_dir.join(DB_FILE_NAME)
            }
        };

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        let storage = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            vector_index: RwLock::new(None),
            index_config,
            path,
        };

        storage.rebuild_vector_index()?;

        Ok(storage)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    /// Shared access to the vector index
    ///
    /// The index is only ever swapped whole, so a poisoned lock still guards
    /// a consistent value and is recovered rather than reported.
    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, Option<VectorIndex>> {
        self.vector_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_index(&self, index: Option<VectorIndex>) {
        *self
            .vector_index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = index;
    }

    // ========================================================================
    // METADATA
    // ========================================================================

    fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn stored_dimensions(conn: &Connection) -> Result<Option<usize>> {
        Ok(Self::read_meta(conn, META_DIMENSIONS)?.and_then(|v| v.parse().ok()))
    }

    /// Index config with persisted dimensions and metric applied
    fn effective_index_config(&self, conn: &Connection) -> Result<Option<VectorIndexConfig>> {
        let Some(dimensions) = Self::stored_dimensions(conn)? else {
            return Ok(None);
        };
        let metric = Self::read_meta(conn, META_METRIC)?
            .and_then(|m| DistanceMetric::parse_name(&m))
            .unwrap_or(self.index_config.metric);

        Ok(Some(VectorIndexConfig {
            dimensions,
            metric,
            ..self.index_config.clone()
        }))
    }

    /// Rebuild the in-memory vector index from persisted embeddings
    fn rebuild_vector_index(&self) -> Result<()> {
        let reader = self.lock_reader()?;

        let Some(config) = self.effective_index_config(&reader)? else {
            drop(reader);
            self.set_index(None);
            return Ok(());
        };

        let mut stmt = reader.prepare(
            "SELECT em.entity_id, em.embedding FROM entity_embeddings em
             JOIN entities e ON e.id = em.entity_id
             ORDER BY e.rowid",
        )?;

        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        drop(stmt);
        drop(reader);

        let mut entries = Vec::with_capacity(rows.len());
        for (entity_id, bytes) in rows {
            let Some(vector) = vector_from_bytes(&bytes) else {
                return Err(StorageError::CorruptEmbedding {
                    entity_id,
                    reason: format!("{} bytes is not a whole number of f32 values", bytes.len()),
                });
            };
            if vector.len() != config.dimensions {
                return Err(StorageError::CorruptEmbedding {
                    entity_id,
                    reason: format!(
                        "expected {} dimensions, got {}",
                        config.dimensions,
                        vector.len()
                    ),
                });
            }
            entries.push((entity_id, vector));
        }

        let count = entries.len();
        let index = VectorIndex::build(config, entries)?;
        tracing::debug!(
            vectors = count,
            kind = ?index.kind(),
            "Vector index rebuilt"
        );

        self.set_index(Some(index));
        Ok(())
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    fn entity_exists(conn: &Connection, id: &str) -> Result<bool> {
        Ok(conn
            .query_row("SELECT 1 FROM entities WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn load_relationship_types(conn: &Connection) -> Result<HashSet<String>> {
        let mut stmt = conn.prepare("SELECT name FROM relationship_types")?;
        let types = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(types)
    }

    /// Load entities, relationship types and edges in a single transaction
    ///
    /// With `replace` set, the existing index is dropped inside the same
    /// transaction, so a rejected batch leaves it untouched.
    ///
    /// Nothing is written unless the whole batch validates: every vector
    /// has the index dimensionality (fixed by the first vector ever stored),
    /// ids are unique, edges use declared relationship types and start at
    /// an entity. Edge targets may be nodes outside the entity set.
    pub fn ingest_batch(&self, batch: IngestBatch) -> Result<IngestSummary> {
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;

        if batch.replace {
            Self::delete_all(&tx)?;
        }

        let mut dimensions = Self::stored_dimensions(&tx)?;
        let mut seen: HashSet<&str> = HashSet::with_capacity(batch.entities.len());

        for entity in &batch.entities {
            if entity.id.trim().is_empty() {
                return Err(StorageError::InvalidInput(
                    "Entity id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(entity.id.as_str()) || Self::entity_exists(&tx, &entity.id)? {
                return Err(StorageError::DuplicateEntity(entity.id.clone()));
            }
            if let Some(vector) = &entity.vector {
                match dimensions {
                    Some(expected) if expected != vector.len() => {
                        return Err(StorageError::DimensionMismatch {
                            entity_id: entity.id.clone(),
                            expected,
                            got: vector.len(),
                        });
                    }
                    None if vector.is_empty() => {
                        return Err(StorageError::InvalidInput(format!(
                            "Entity {} has an empty vector",
                            entity.id
                        )));
                    }
                    None => dimensions = Some(vector.len()),
                    _ => {}
                }
            }
        }

        let mut known_types = Self::load_relationship_types(&tx)?;
        let mut new_types = 0;
        for name in &batch.relationship_types {
            if name.trim().is_empty() {
                return Err(StorageError::InvalidInput(
                    "Relationship type cannot be empty".to_string(),
                ));
            }
            if known_types.insert(name.clone()) {
                tx.execute(
                    "INSERT INTO relationship_types (name) VALUES (?1)",
                    params![name],
                )?;
                new_types += 1;
            }
        }

        for edge in &batch.relationships {
            if !known_types.contains(&edge.relationship_type) {
                return Err(StorageError::UnknownRelationshipType(
                    edge.relationship_type.clone(),
                ));
            }
            if !seen.contains(edge.source_id.as_str())
                && !Self::entity_exists(&tx, &edge.source_id)?
            {
                return Err(StorageError::UnknownSource(edge.source_id.clone()));
            }
        }

        let now = Utc::now();
        let mut summary = IngestSummary {
            relationship_types: new_types,
            ..IngestSummary::default()
        };

        {
            let mut entity_stmt = tx.prepare(
                "INSERT INTO entities (id, kind, body, attributes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut embedding_stmt = tx.prepare(
                "INSERT INTO entity_embeddings (entity_id, embedding, dimensions, model)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for entity in &batch.entities {
                let attributes = serde_json::to_string(&entity.attributes)?;
                entity_stmt.execute(params![
                    entity.id,
                    entity.kind(),
                    entity.body,
                    attributes,
                    now.to_rfc3339(),
                ])?;
                summary.entities += 1;

                if let Some(vector) = &entity.vector {
                    embedding_stmt.execute(params![
                        entity.id,
                        vector_to_bytes(vector),
                        vector.len() as i64,
                        batch.embedding_model,
                    ])?;
                    summary.embeddings += 1;
                }
            }

            let mut edge_stmt = tx.prepare(
                "INSERT INTO relationships (source_id, target_id, relationship_type, attributes)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for edge in &batch.relationships {
                let attributes = serde_json::to_string(&edge.attributes)?;
                edge_stmt.execute(params![
                    edge.source_id,
                    edge.target_id,
                    edge.relationship_type,
                    attributes,
                ])?;
                summary.relationships += 1;
            }
        }

        if let Some(d) = dimensions {
            Self::write_meta(&tx, META_DIMENSIONS, &d.to_string())?;
            if Self::read_meta(&tx, META_METRIC)?.is_none() {
                Self::write_meta(&tx, META_METRIC, self.index_config.metric.as_str())?;
            }
        }
        if let Some(model) = &batch.embedding_model {
            Self::write_meta(&tx, META_EMBEDDING_MODEL, model)?;
        }
        Self::write_meta(&tx, META_BUILT_AT, &now.to_rfc3339())?;

        tx.commit()?;
        drop(writer);

        self.rebuild_vector_index()?;

        tracing::info!(
            entities = summary.entities,
            embeddings = summary.embeddings,
            relationships = summary.relationships,
            "Ingested batch"
        );

        Ok(summary)
    }

    fn delete_all(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "DELETE FROM relationships;
             DELETE FROM entity_embeddings;
             DELETE FROM entities;
             DELETE FROM relationship_types;
             DELETE FROM index_meta;",
        )?;
        Ok(())
    }

    /// Remove every entity, edge, relationship type and index metadata
    pub fn clear(&self) -> Result<()> {
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;
        Self::delete_all(&tx)?;
        tx.commit()?;
        drop(writer);

        self.set_index(None);
        tracing::info!("Index cleared");
        Ok(())
    }

    // ========================================================================
    // RETRIEVAL
    // ========================================================================

    /// Keyword search with FTS5, ranked by BM25
    ///
    /// Ties are broken by insertion order. Returns an empty list when the
    /// query has no searchable terms or nothing matches.
    pub fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<RankedHit>> {
        let sanitized_query = sanitize_fts5_query(query);
        if sanitized_query.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT e.id, bm25(entity_fts) FROM entity_fts
             JOIN entities e ON e.rowid = entity_fts.rowid
             WHERE entity_fts MATCH ?1
             ORDER BY bm25(entity_fts), entity_fts.rowid
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![sanitized_query, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, bm25) = row?;
            // SQLite's bm25() is lower-is-better; flip for display
            scored.push((id, (-bm25) as f32));
        }
        Ok(rank_hits(scored))
    }

    /// Nearest-neighbor search; empty until an index with vectors is built
    pub fn vector_search(&self, vector: &[f32], limit: usize) -> Result<Vec<RankedHit>> {
        let index = self.read_index();
        let Some(index) = index.as_ref() else {
            return Ok(vec![]);
        };

        index.search(vector, limit).map_err(|e| match e {
            VectorSearchError::InvalidDimensions(expected, got) => {
                StorageError::QueryDimensionMismatch { expected, got }
            }
            other => StorageError::VectorIndex(other),
        })
    }

    /// Vector index dimensionality, once built
    pub fn dimensions(&self) -> Option<usize> {
        self.read_index().as_ref().map(VectorIndex::dimensions)
    }

    fn edges_touching(conn: &Connection, ids: &[String]) -> Result<Vec<RelationshipEdge>> {
        let mut raw: BTreeMap<i64, (String, String, String, String)> = BTreeMap::new();

        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, source_id, target_id, relationship_type, attributes
                 FROM relationships
                 WHERE source_id IN ({p}) OR target_id IN ({p})",
                p = placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter().chain(chunk.iter())), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    (
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ),
                ))
            })?;
            for row in rows {
                let (id, edge) = row?;
                raw.insert(id, edge);
            }
        }

        // Edge id order is insertion order
        raw.into_values()
            .map(|(source_id, target_id, relationship_type, attributes)| {
                Ok(RelationshipEdge {
                    source_id,
                    target_id,
                    relationship_type,
                    attributes: parse_attributes(&attributes)?,
                })
            })
            .collect()
    }

    /// Nodes reachable from the seeds within `query.depth` hops
    pub fn neighbors(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>> {
        let reader = self.lock_reader()?;

        if let Some(types) = &query.edge_types {
            let known = Self::load_relationship_types(&reader)?;
            if let Some(unknown) = types.iter().find(|t| !known.contains(*t)) {
                return Err(StorageError::UnknownRelationshipType(unknown.clone()));
            }
        }

        expand_neighbors(query, |frontier| Self::edges_touching(&reader, frontier))
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Entities among `ids` that exist, without vectors
    pub fn get_entities(&self, ids: &[String]) -> Result<HashMap<String, Entity>> {
        let reader = self.lock_reader()?;
        let mut entities = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, body, attributes FROM entities WHERE id IN ({})",
                placeholders
            );
            let mut stmt = reader.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            for row in rows {
                let (id, body, attributes) = row?;
                let entity = Entity {
                    id: id.clone(),
                    body,
                    vector: None,
                    attributes: parse_attributes(&attributes)?,
                };
                entities.insert(id, entity);
            }
        }

        Ok(entities)
    }

    /// A single entity including its vector
    pub fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        let reader = self.lock_reader()?;
        let row = reader
            .query_row(
                "SELECT e.id, e.body, e.attributes, em.embedding FROM entities e
                 LEFT JOIN entity_embeddings em ON em.entity_id = e.id
                 WHERE e.id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<Vec<u8>>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, body, attributes, embedding)) = row else {
            return Ok(None);
        };

        Ok(Some(Entity {
            id,
            body,
            vector: embedding.as_deref().and_then(vector_from_bytes),
            attributes: parse_attributes(&attributes)?,
        }))
    }

    /// Declared relationship types, sorted
    pub fn relationship_types(&self) -> Result<Vec<String>> {
        let reader = self.lock_reader()?;
        let mut types: Vec<String> = Self::load_relationship_types(&reader)?.into_iter().collect();
        types.sort();
        Ok(types)
    }

    /// Index statistics
    pub fn stats(&self) -> Result<IndexStats> {
        let reader = self.lock_reader()?;

        let count = |sql: &str| -> Result<i64> { Ok(reader.query_row(sql, [], |row| row.get(0))?) };

        let total_entities = count("SELECT COUNT(*) FROM entities")?;
        let entities_with_vectors = count("SELECT COUNT(*) FROM entity_embeddings")?;
        let total_relationships = count("SELECT COUNT(*) FROM relationships")?;
        let relationship_types = count("SELECT COUNT(*) FROM relationship_types")?;

        let dimensions = Self::stored_dimensions(&reader)?;
        let embedding_model = Self::read_meta(&reader, META_EMBEDDING_MODEL)?;
        let built_at = Self::read_meta(&reader, META_BUILT_AT)?.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        Ok(IndexStats {
            total_entities,
            entities_with_vectors,
            total_relationships,
            relationship_types,
            dimensions,
            embedding_model,
            built_at,
        })
    }
}

// ============================================================================
// ENCODING HELPERS
// ============================================================================

fn parse_attributes(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Encode a vector as little-endian f32 bytes
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes; `None` if the length is not a multiple of 4
pub fn vector_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

// ============================================================================
// TESTS
// ============================================================================
