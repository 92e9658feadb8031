//! Local Semantic Embeddings
//!
//! Uses fastembed v5 for local ONNX inference: nomic-embed-text-v1.5
//! (768d, 8192 token context), Matryoshka-truncated to 256d and L2-normalized.
//! Inference is CPU-bound, so every call runs on tokio's blocking pool.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Mutex, OnceLock};

use super::{l2_normalize, EmbeddingError, EmbeddingProvider};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Embedding dimensions after Matryoshka truncation
/// (the first N dims of a Matryoshka model ARE the N-dim representation)
pub const EMBEDDING_DIMENSIONS: usize = 256;

/// Maximum text length in bytes (truncated at a char boundary if longer)
pub const MAX_TEXT_LENGTH: usize = 8192;

/// Batch size for embedding generation
pub const BATCH_SIZE: usize = 32;

/// Model recorded in the index metadata
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-ai/nomic-embed-text-v1.5";

// ============================================================================
// GLOBAL MODEL (with Mutex for fastembed v5 API)
// ============================================================================

static EMBEDDING_MODEL_RESULT: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

/// Cache directory for fastembed models
/// Uses FASTEMBED_CACHE_PATH env var, or falls back to platform cache directory
fn get_cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }

    // Linux: ~/.cache/lattice/fastembed
    // macOS: ~/Library/Caches/com.lattice.core/fastembed
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "lattice", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/lattice/fastembed");
    }

    std::path::PathBuf::from(".fastembed_cache")
}

fn get_model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = EMBEDDING_MODEL_RESULT.get_or_init(|| {
        let cache_dir = get_cache_dir();

        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("Failed to create cache directory {:?}: {}", cache_dir, e);
        }

        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
            .with_show_download_progress(true)
            .with_cache_dir(cache_dir);

        TextEmbedding::try_new(options).map(Mutex::new).map_err(|e| {
            format!(
                "Failed to initialize nomic-embed-text-v1.5 embedding model: {}. \
                Ensure ONNX runtime is available and model files can be downloaded.",
                e
            )
        })
    });

    match result {
        Ok(model) => model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("Lock poisoned: {}", e))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

fn truncate_text(text: &str) -> &str {
    if text.len() <= MAX_TEXT_LENGTH {
        return text;
    }
    let mut end = MAX_TEXT_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn embed_blocking(texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut model = get_model()?;
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(BATCH_SIZE) {
        let truncated: Vec<&str> = chunk.iter().map(|t| truncate_text(t)).collect();

        let embeddings = model
            .embed(truncated, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        all_embeddings.extend(embeddings.into_iter().map(matryoshka_truncate));
    }

    Ok(all_embeddings)
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Local fastembed provider
#[derive(Debug, Default, Clone)]
pub struct FastEmbedProvider {
    _unused: (),
}

impl FastEmbedProvider {
    /// Create a new provider; the model loads lazily on first use
    pub fn new() -> Self {
        Self { _unused: () }
    }

    /// Load the model now (downloads if necessary)
    pub async fn init(&self) -> Result<(), EmbeddingError> {
        tokio::task::spawn_blocking(|| get_model().map(|_| ()))
            .await
            .map_err(|e| EmbeddingError::ModelInit(format!("Model loader panicked: {}", e)))?
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            EmbeddingError::EmbeddingFailed("No embedding generated".to_string())
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || embed_blocking(texts))
            .await
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("Embedding task failed: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        DEFAULT_EMBEDDING_MODEL
    }
}

/// Apply Matryoshka truncation: truncate to EMBEDDING_DIMENSIONS and L2-normalize
#[inline]
pub fn matryoshka_truncate(mut vector: Vec<f32>) -> Vec<f32> {
    if vector.len() > EMBEDDING_DIMENSIONS {
        vector.truncate(EMBEDDING_DIMENSIONS);
    }
    l2_normalize(&mut vector);
    vector
}

// ============================================================================
// TESTS
// ============================================================================
