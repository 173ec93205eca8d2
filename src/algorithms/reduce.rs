use std::collections::{BTreeMap, BTreeSet, HashMap};

use ot_store::{Commit, CommitKey, CommitStore};

use super::OtAlgorithms;
use super::reducer::DiffsReducer;
use super::walker::GraphWalker;
use crate::algebra::OtDiff;
use crate::error::OtError;

/// Per pending commit: head id → accumulator from that head down to the
/// commit.
struct ReduceEdgesWalker<'r, K, A, R> {
    ancestor: K,
    reducer: &'r R,
    pending: HashMap<K, BTreeMap<K, A>>,
}

impl<K, D, A, R> GraphWalker<K, D> for ReduceEdgesWalker<'_, K, A, R>
where
    K: CommitKey,
    A: Clone,
    R: DiffsReducer<D, Acc = A>,
{
    type Output = BTreeMap<K, A>;

    fn on_start(&mut self, heads: &[Commit<K, D>]) {
        for head in heads {
            self.pending.insert(
                head.id().clone(),
                BTreeMap::from([(head.id().clone(), self.reducer.initial())]),
            );
        }
    }

    fn on_commit(&mut self, commit: &Commit<K, D>) -> Result<Option<BTreeMap<K, A>>, OtError> {
        let by_head = self.pending.remove(commit.id()).unwrap_or_default();
        if *commit.id() == self.ancestor {
            return Ok(Some(by_head));
        }
        for (parent, diffs) in commit.parents() {
            let parent_entry = self.pending.entry(parent.clone()).or_default();
            for (head, acc) in &by_head {
                let next = self.reducer.accumulate(acc, diffs);
                let merged = match parent_entry.remove(head) {
                    Some(existing) => self.reducer.combine(existing, next),
                    None => next,
                };
                parent_entry.insert(head.clone(), merged);
            }
        }
        Ok(None)
    }
}

impl<S> OtAlgorithms<'_, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    /// For each of `heads`, the diffs accumulated on the way from that head
    /// down to `ancestor`.
    ///
    /// Heads that do not reach `ancestor` are absent from the result.
    ///
    /// # Errors
    /// [`OtError::IncompleteGraph`] if `ancestor` is never reached.
    #[tracing::instrument(skip_all, fields(heads = heads.len(), ancestor = %ancestor))]
    pub async fn reduce_edges<R>(
        &self,
        heads: &BTreeSet<S::Id>,
        ancestor: &S::Id,
        reducer: &R,
    ) -> Result<BTreeMap<S::Id, R::Acc>, OtError>
    where
        R: DiffsReducer<S::Diff>,
    {
        let walker = ReduceEdgesWalker {
            ancestor: ancestor.clone(),
            reducer,
            pending: HashMap::<S::Id, BTreeMap<S::Id, R::Acc>>::new(),
        };
        self.walk_graph(heads, walker).await
    }
}
