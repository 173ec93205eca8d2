//! Operational-transformation commit graph engine.
//!
//! Writers append batches of diffs as commits to a shared, append-only graph
//! held by an [`ot_store::CommitStore`]. This crate reconciles concurrent
//! heads:
//!
//! - [`algebra`]: the registered transform/squash/invert functions for an
//!   application's diff type.
//! - [`graph`]: an in-memory slice of the commit graph and the N-way merge
//!   over it.
//! - [`algorithms`]: priority-ordered walks over the store: checkout, cut
//!   and ancestor searches, and merge-and-push.

pub mod algebra;
pub mod algorithms;
pub mod config;
pub mod error;
pub mod graph;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use algebra::{ConflictResolution, OtDiff, OtSystem, OtSystemBuilder, TransformResult, Transformed};
pub use algorithms::{DiffsReducer, FindResult, GraphWalker, ListReducer, OtAlgorithms};
pub use config::EngineConfig;
pub use error::OtError;
pub use graph::LoadedGraph;
