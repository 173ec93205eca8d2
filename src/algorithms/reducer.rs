//! Folding the diffs found along a walk into an accumulator.

/// How a walk folds parent-edge diffs as it moves away from a head.
///
/// The walk starts each head with [`initial`](Self::initial), calls
/// [`accumulate`](Self::accumulate) with the diffs of every edge it crosses
/// towards a parent, and [`combine`](Self::combine) when two paths reach the
/// same commit for the same head.
pub trait DiffsReducer<D> {
    type Acc: Clone;

    fn initial(&self) -> Self::Acc;

    fn accumulate(&self, acc: &Self::Acc, diffs: &[D]) -> Self::Acc;

    /// Keeps the first accumulator by default.
    fn combine(&self, existing: Self::Acc, _other: Self::Acc) -> Self::Acc {
        existing
    }
}

/// Collects diffs so that the result replays forward from the found ancestor
/// to the head: each crossed edge is prepended.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListReducer;

impl<D: Clone> DiffsReducer<D> for ListReducer {
    type Acc = Vec<D>;

    fn initial(&self) -> Vec<D> {
        Vec::new()
    }

    fn accumulate(&self, acc: &Vec<D>, diffs: &[D]) -> Vec<D> {
        let mut out = Vec::with_capacity(diffs.len() + acc.len());
        out.extend_from_slice(diffs);
        out.extend_from_slice(acc);
        out
    }
}
