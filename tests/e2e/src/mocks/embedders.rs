//! Mock embedding providers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lattice_core::{EmbeddingError, EmbeddingProvider};

/// Returns the same vector for every text
pub struct FixedEmbedder {
    vector: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedEmbedder {
    /// Embed everything as `vector`
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Always fails, as if the model could not be loaded
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    /// Failing embedder claiming `dimensions`
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::ModelInit(
            "model files not found in cache".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Answers only after a delay
pub struct SlowEmbedder {
    inner: FixedEmbedder,
    delay: Duration,
}

impl SlowEmbedder {
    /// Embed as `vector` after `delay`
    pub fn new(vector: Vec<f32>, delay: Duration) -> Self {
        Self {
            inner: FixedEmbedder::new(vector),
            delay,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}
