//! Engine configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment:
//! - `LATTICE_RRF_K`: fusion constant
//! - `LATTICE_TRAVERSAL_DEPTH`: default expansion depth
//! - `LATTICE_DATA_DIR`: directory holding `lattice.db`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::embeddings::DEFAULT_CACHE_CAPACITY;
use crate::model::SearchLimits;
use crate::search::{
    ExpansionScoring, HybridSearchConfig, StageTimeouts, VectorIndexConfig, DEFAULT_RRF_K,
};

/// Configuration error
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// File is not valid config JSON
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// Values are out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Stage timeouts in milliseconds; `null` disables a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutsConfig {
    /// Query embedding
    pub embed_ms: Option<u64>,
    /// Lexical retrieval
    pub lexical_ms: Option<u64>,
    /// Vector retrieval
    pub vector_ms: Option<u64>,
    /// Graph expansion
    pub graph_ms: Option<u64>,
    /// Display-field lookup
    pub lookup_ms: Option<u64>,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            embed_ms: Some(10_000),
            lexical_ms: Some(5_000),
            vector_ms: Some(5_000),
            graph_ms: Some(5_000),
            lookup_ms: Some(5_000),
        }
    }
}

impl From<TimeoutsConfig> for StageTimeouts {
    fn from(config: TimeoutsConfig) -> Self {
        Self {
            embed: config.embed_ms.map(Duration::from_millis),
            lexical: config.lexical_ms.map(Duration::from_millis),
            vector: config.vector_ms.map(Duration::from_millis),
            graph: config.graph_ms.map(Duration::from_millis),
            lookup: config.lookup_ms.map(Duration::from_millis),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Directory holding the database; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// RRF constant
    pub rrf_k: f64,
    /// Default per-query limits
    pub limits: SearchLimits,
    /// Default expansion depth (0 disables expansion)
    pub traversal_depth: usize,
    /// Expansion hit weighting
    pub expansion: ExpansionScoring,
    /// Per-stage timeouts
    pub timeouts: TimeoutsConfig,
    /// Vector index parameters
    pub vector_index: VectorIndexConfig,
    /// Query embeddings kept in the LRU cache
    pub embedding_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            rrf_k: DEFAULT_RRF_K,
            limits: SearchLimits::default(),
            traversal_depth: 1,
            expansion: ExpansionScoring::default(),
            timeouts: TimeoutsConfig::default(),
            vector_index: VectorIndexConfig::default(),
            embedding_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Read a config file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given (defaults otherwise), then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("LATTICE_RRF_K") {
            match raw.parse() {
                Ok(k) => self.rrf_k = k,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid LATTICE_RRF_K"),
            }
        }
        if let Some(raw) = lookup("LATTICE_TRAVERSAL_DEPTH") {
            match raw.parse() {
                Ok(depth) => self.traversal_depth = depth,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid LATTICE_TRAVERSAL_DEPTH"),
            }
        }
        if let Some(dir) = lookup("LATTICE_DATA_DIR") {
            if !dir.is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Check values are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rrf_k.is_finite() || self.rrf_k < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rrfK must be a non-negative number, got {}",
                self.rrf_k
            )));
        }
        self.limits.validate().map_err(ConfigError::Invalid)?;
        if self.vector_index.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "vectorIndex.dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Database file path
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(crate::storage::DB_FILE_NAME))
    }

    /// Orchestrator settings
    pub fn search_config(&self) -> HybridSearchConfig {
        HybridSearchConfig {
            rrf_k: self.rrf_k,
            limits: self.limits,
            traversal_depth: self.traversal_depth,
            expansion: self.expansion,
            timeouts: self.timeouts.into(),
        }
    }
}
