//! Semantic Embeddings Module
//!
//! The embedding provider is a black box to the retrieval engine: text in,
//! fixed-length vector out. Providers:
//! - `FastEmbedProvider`: local ONNX inference via fastembed (feature `embeddings`)
//! - `HashingEmbedder`: deterministic feature hashing, no model download
//! - `CachedEmbedder`: LRU cache for repeated query embeddings

mod cache;
mod hashing;
#[cfg(feature = "embeddings")]
mod local;
mod similarity;

use async_trait::async_trait;

pub use cache::{CachedEmbedder, DEFAULT_CACHE_CAPACITY};
pub use hashing::HashingEmbedder;
#[cfg(feature = "embeddings")]
pub use local::{
    matryoshka_truncate, FastEmbedProvider, BATCH_SIZE, DEFAULT_EMBEDDING_MODEL,
    EMBEDDING_DIMENSIONS, MAX_TEXT_LENGTH,
};
pub use similarity::{cosine_similarity, dot_product, euclidean_distance, l2_normalize};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Embedding error types
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    ModelInit(String),
    /// Failed to generate embedding
    EmbeddingFailed(String),
    /// Invalid input (empty, too long, etc.)
    InvalidInput(String),
}

impl std::fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingError::ModelInit(e) => write!(f, "Model initialization failed: {}", e),
            EmbeddingError::EmbeddingFailed(e) => write!(f, "Embedding generation failed: {}", e),
            EmbeddingError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
        }
    }
}

impl std::error::Error for EmbeddingError {}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Maps text to a dense vector of fixed dimensionality
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts; output order matches input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Output dimensionality
    fn dimensions(&self) -> usize;

    /// Model identifier recorded in the index metadata
    fn model_name(&self) -> &str;
}
