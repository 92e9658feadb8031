//! Async adapters from [`Storage`] to the orchestrator's backend traits
//!
//! SQLite calls block, so each one runs on tokio's blocking pool. The
//! lexical query holds the reader connection while the vector query holds
//! a read lock on the vector index, so the two run in parallel and vector
//! queries never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Storage, StorageError};
use crate::graph::{Neighbor, NeighborQuery};
use crate::model::{Entity, RankedHit};
use crate::search::{
    BackendError, EntityLookup, GraphBackend, LexicalBackend, LexicalQuery, VectorBackend,
    VectorQuery,
};

impl From<StorageError> for BackendError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::QueryDimensionMismatch { expected, got } => {
                BackendError::DimensionMismatch { expected, got }
            }
            StorageError::UnknownRelationshipType(t) => BackendError::UnknownRelationshipType(t),
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

/// Shared storage handle implementing every backend trait
#[derive(Clone)]
pub struct StorageBackend {
    storage: Arc<Storage>,
}

impl StorageBackend {
    /// Wrap a shared storage instance
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Underlying storage
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    async fn run<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T, StorageError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || f(storage.as_ref()))
            .await
            .map_err(|e| BackendError::Unavailable(format!("Storage task failed: {}", e)))?
            .map_err(BackendError::from)
    }
}

#[async_trait]
impl LexicalBackend for StorageBackend {
    async fn search_text(&self, query: &LexicalQuery) -> Result<Vec<RankedHit>, BackendError> {
        let query = query.clone();
        self.run(move |s| s.keyword_search(&query.text, query.limit))
            .await
    }
}

#[async_trait]
impl VectorBackend for StorageBackend {
    async fn search_vector(&self, query: &VectorQuery) -> Result<Vec<RankedHit>, BackendError> {
        let query = query.clone();
        self.run(move |s| s.vector_search(&query.vector, query.limit))
            .await
    }

    fn dimensions(&self) -> Option<usize> {
        self.storage.dimensions()
    }
}

#[async_trait]
impl GraphBackend for StorageBackend {
    async fn neighbors(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, BackendError> {
        let query = query.clone();
        self.run(move |s| s.neighbors(&query)).await
    }
}

#[async_trait]
impl EntityLookup for StorageBackend {
    async fn get_entities(&self, ids: &[String]) -> Result<HashMap<String, Entity>, BackendError> {
        let ids = ids.to_vec();
        self.run(move |s| s.get_entities(&ids)).await
    }
}
