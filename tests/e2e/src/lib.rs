//! End-to-end test support for the Lattice retrieval engine
//!
//! - `harness`: isolated temporary indexes
//! - `mocks`: deterministic embedders and fixture corpora

pub mod harness;
pub mod mocks;
