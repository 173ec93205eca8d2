//! In-memory view of the part of the commit graph a merge needs.
//!
//! A [`LoadedGraph`] is filled incrementally while walking down from a set of
//! heads and then merged in memory; see
//! [`OtAlgorithms::load_graph`](crate::algorithms::OtAlgorithms::load_graph).

mod loaded;

pub use loaded::LoadedGraph;
