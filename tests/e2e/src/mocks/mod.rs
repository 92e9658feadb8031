//! Deterministic collaborators for end-to-end tests

mod embedders;
pub mod fixtures;

pub use embedders::{FailingEmbedder, FixedEmbedder, SlowEmbedder};
