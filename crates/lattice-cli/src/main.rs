//! Lattice CLI
//!
//! Builds a hybrid index from a corpus file and queries it from the terminal.

mod output;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lattice_core::search::GraphBackend;
use lattice_core::{
    CachedEmbedder, Corpus, EmbeddingProvider, EngineConfig, HashingEmbedder, HybridSearcher,
    Ingestor, NeighborQuery, SearchBackends, SearchLimits, SearchMode, SearchRequest, Storage,
    StorageBackend,
};

/// Lattice - Hybrid Retrieval CLI
#[derive(Parser)]
#[command(name = "lattice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hybrid keyword + vector + graph retrieval")]
#[command(long_about = "Lattice indexes entities for BM25 keyword search, dense vector search and typed relationship traversal.\n\nQueries fuse the keyword and vector rankings with Reciprocal Rank Fusion, then expand the top hits along relationship edges.")]
struct Cli {
    /// Directory holding lattice.db
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the index with one built from a corpus file
    Index {
        /// Corpus JSON file
        corpus: PathBuf,
        /// Embedding provider for entities without a vector
        #[arg(long, value_enum, default_value_t = EmbedderKind::Auto)]
        embedder: EmbedderKind,
        /// Vector dimensions for the hashing embedder
        #[arg(long)]
        dimensions: Option<usize>,
    },

    /// Run a hybrid query
    Search {
        /// Query text
        query: String,
        /// Hits requested from the keyword index
        #[arg(long)]
        lexical_limit: Option<usize>,
        /// Hits requested from the vector index
        #[arg(long)]
        vector_limit: Option<usize>,
        /// Direct hits kept after fusion
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Relationship expansion depth (0 disables expansion)
        #[arg(long)]
        depth: Option<usize>,
        /// hybrid, lexical or vector
        #[arg(long, default_value = "hybrid")]
        mode: SearchMode,
        /// Only expand along these relationship types
        #[arg(long = "type")]
        edge_types: Vec<String>,
        /// Embedding provider for the query
        #[arg(long, value_enum, default_value_t = EmbedderKind::Auto)]
        embedder: EmbedderKind,
    },

    /// List the graph neighbors of an entity
    Neighbors {
        /// Entity or node id
        id: String,
        /// Traversal depth
        #[arg(long, default_value = "1")]
        depth: usize,
        /// Only follow these relationship types
        #[arg(long = "type")]
        edge_types: Vec<String>,
    },

    /// Show index statistics
    Stats,
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Match the model recorded in the index, else the best available
    Auto,
    /// Deterministic feature hashing (no model download)
    Hash,
    /// Local fastembed model
    Fastembed,
}

const HASHING_MODEL: &str = "feature-hashing";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let mut config = EngineConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let storage = Arc::new(
        Storage::with_config(config.database_path(), config.vector_index.clone())
            .context("Failed to open index")?,
    );
    info!("Index opened at {}", storage.path().display());

    match cli.command {
        Commands::Index {
            corpus,
            embedder,
            dimensions,
        } => run_index(&config, storage, corpus, embedder, dimensions, cli.json).await,
        Commands::Search {
            query,
            lexical_limit,
            vector_limit,
            limit,
            depth,
            mode,
            edge_types,
            embedder,
        } => {
            let defaults = config.limits;
            let limits = SearchLimits::new(
                lexical_limit.unwrap_or(defaults.lexical_limit),
                vector_limit.unwrap_or(defaults.vector_limit),
                limit.unwrap_or(defaults.fused_limit),
            );
            let mut request = SearchRequest::new(query).with_limits(limits).with_mode(mode);
            if let Some(depth) = depth {
                request = request.with_depth(depth);
            }
            if !edge_types.is_empty() {
                request = request.with_edge_types(edge_types);
            }
            run_search(&config, storage, request, embedder, cli.json).await
        }
        Commands::Neighbors {
            id,
            depth,
            edge_types,
        } => run_neighbors(storage, id, depth, edge_types, cli.json).await,
        Commands::Stats => run_stats(&storage, cli.json),
    }
}

/// Rebuild the index from a corpus file
async fn run_index(
    config: &EngineConfig,
    storage: Arc<Storage>,
    corpus_path: PathBuf,
    kind: EmbedderKind,
    dimensions: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let corpus = Corpus::from_file(&corpus_path)?;
    let dimensions = dimensions.unwrap_or(config.vector_index.dimensions);
    let embedder = build_embedder(kind, None, dimensions).await?;

    let report = Ingestor::new(storage, embedder)
        .rebuild(corpus)
        .await
        .with_context(|| format!("Failed to index {}", corpus_path.display()))?;

    output::print_report(&report, json)
}

/// Run one query
async fn run_search(
    config: &EngineConfig,
    storage: Arc<Storage>,
    request: SearchRequest,
    kind: EmbedderKind,
    json: bool,
) -> anyhow::Result<()> {
    let stats = storage.stats()?;
    let dimensions = stats.dimensions.unwrap_or(config.vector_index.dimensions);

    let embedder: Arc<dyn EmbeddingProvider> = if request.mode.uses_vector() {
        let inner = build_embedder(kind, stats.embedding_model.as_deref(), dimensions).await?;
        Arc::new(CachedEmbedder::new(inner, config.embedding_cache_capacity))
    } else {
        // Never called in lexical mode; sized to pass the dimension check
        Arc::new(HashingEmbedder::new(dimensions))
    };

    let searcher = HybridSearcher::new(
        SearchBackends::from_storage(storage, embedder),
        config.search_config(),
    )?;
    let results = searcher.search(&request).await?;

    output::print_results(&request.query, &results, json)
}

/// List neighbors of one node
async fn run_neighbors(
    storage: Arc<Storage>,
    id: String,
    depth: usize,
    edge_types: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut query = NeighborQuery::new(vec![id.clone()], depth);
    if !edge_types.is_empty() {
        query = query.with_edge_types(edge_types);
    }

    let neighbors = StorageBackend::new(storage).neighbors(&query).await?;
    output::print_neighbors(&id, &neighbors, json)
}

/// Show index statistics
fn run_stats(storage: &Storage, json: bool) -> anyhow::Result<()> {
    let stats = storage.stats()?;
    let types = storage.relationship_types()?;
    output::print_stats(storage.path(), &stats, &types, json)
}

/// Pick an embedding provider
///
/// `indexed_model` is the model recorded at build time; `Auto` follows it so
/// query vectors live in the same space as the indexed ones.
async fn build_embedder(
    kind: EmbedderKind,
    indexed_model: Option<&str>,
    dimensions: usize,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let kind = match kind {
        EmbedderKind::Auto => match indexed_model {
            Some(HASHING_MODEL) => EmbedderKind::Hash,
            Some(_) => EmbedderKind::Fastembed,
            None if cfg!(feature = "embeddings") => EmbedderKind::Fastembed,
            None => EmbedderKind::Hash,
        },
        explicit => explicit,
    };

    match kind {
        EmbedderKind::Hash => Ok(Arc::new(HashingEmbedder::new(dimensions))),
        EmbedderKind::Fastembed | EmbedderKind::Auto => fastembed_provider().await,
    }
}

#[cfg(feature = "embeddings")]
async fn fastembed_provider() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider = lattice_core::FastEmbedProvider::new();
    if let Err(e) = provider.init().await {
        warn!("Failed to initialize embedding model: {}", e);
        warn!("Hint: Check FASTEMBED_CACHE_PATH or use --embedder hash");
        bail!("Embedding model unavailable: {}", e);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "embeddings"))]
async fn fastembed_provider() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    warn!("Built without the embeddings feature");
    bail!("fastembed is not available in this build; use --embedder hash")
}
