//! Ancestor search: `find_parent` and `checkout`.

use std::collections::{BTreeSet, HashMap};

use ot_store::{Commit, CommitKey, CommitStore};
use tracing::instrument;

use super::OtAlgorithms;
use super::reducer::{DiffsReducer, ListReducer};
use super::walker::GraphWalker;
use crate::algebra::OtDiff;
use crate::error::OtError;

/// The first commit a [`find_parent`](OtAlgorithms::find_parent) walk
/// accepted, with the diffs accumulated on the way down from its head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindResult<K, A> {
    pub commit: K,
    pub parents: BTreeSet<K>,
    pub order: u64,
    pub snapshot: bool,
    /// The start head the accepted commit was reached from.
    pub child: K,
    pub child_order: u64,
    pub accumulated: A,
}

struct Reached<K, A> {
    child: K,
    child_order: Option<u64>,
    acc: A,
}

struct FindParentWalker<'r, K, A, R, P> {
    reducer: &'r R,
    predicate: P,
    reached: HashMap<K, Reached<K, A>>,
}

impl<K, D, A, R, P> GraphWalker<K, D> for FindParentWalker<'_, K, A, R, P>
where
    K: CommitKey,
    A: Clone,
    R: DiffsReducer<D, Acc = A>,
    P: Fn(&Commit<K, D>) -> bool,
{
    type Output = FindResult<K, A>;

    fn on_start(&mut self, heads: &[Commit<K, D>]) {
        for head in heads {
            self.reached.insert(
                head.id().clone(),
                Reached {
                    child: head.id().clone(),
                    child_order: None,
                    acc: self.reducer.initial(),
                },
            );
        }
    }

    fn on_commit(&mut self, commit: &Commit<K, D>) -> Result<Option<Self::Output>, OtError> {
        let reached = self.reached.remove(commit.id()).ok_or_else(|| {
            OtError::incomplete(format!("commit {} was walked but never reached", commit.id()))
        })?;
        let child_order = reached.child_order.unwrap_or_else(|| commit.order());

        if (self.predicate)(commit) {
            return Ok(Some(FindResult {
                commit: commit.id().clone(),
                parents: commit.parent_set(),
                order: commit.order(),
                snapshot: commit.is_snapshot(),
                child: reached.child,
                child_order,
                accumulated: reached.acc,
            }));
        }

        for (parent, diffs) in commit.parents() {
            self.reached.insert(
                parent.clone(),
                Reached {
                    child: reached.child.clone(),
                    child_order: Some(child_order),
                    acc: self.reducer.accumulate(&reached.acc, diffs),
                },
            );
        }
        Ok(None)
    }
}

impl<S> OtAlgorithms<'_, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    /// Walk down from `heads` to the first commit accepted by `predicate`.
    ///
    /// # Errors
    /// [`OtError::IncompleteGraph`] if no reachable commit matches.
    pub async fn find_parent<R, P>(
        &self,
        heads: &BTreeSet<S::Id>,
        reducer: &R,
        predicate: P,
    ) -> Result<FindResult<S::Id, R::Acc>, OtError>
    where
        R: DiffsReducer<S::Diff>,
        P: Fn(&Commit<S::Id, S::Diff>) -> bool,
    {
        let walker = FindParentWalker {
            reducer,
            predicate,
            reached: HashMap::<S::Id, Reached<S::Id, R::Acc>>::new(),
        };
        self.walk_graph(heads, walker).await
    }

    /// Materialize the state at `head`: the nearest snapshot (or the empty
    /// state at a root) followed by every diff down to `head`, squashed.
    ///
    /// # Errors
    /// Store failures, and [`OtError::IncompleteGraph`] if neither a
    /// snapshot nor a root is reachable.
    #[instrument(skip_all, fields(head = %head))]
    pub async fn checkout(&self, head: &S::Id) -> Result<Vec<S::Diff>, OtError> {
        let found = self
            .find_parent(&BTreeSet::from([head.clone()]), &ListReducer, |commit| {
                commit.is_snapshot() || commit.is_root()
            })
            .await?;
        tracing::debug!(
            base = %found.commit,
            snapshot = found.snapshot,
            diffs = found.accumulated.len(),
            "found checkout base"
        );

        let mut diffs = if found.snapshot {
            self.store.load_snapshot(&found.commit).await?
        } else {
            Vec::new()
        };
        diffs.extend(found.accumulated);
        Ok(self.system.squash(&diffs))
    }
}
