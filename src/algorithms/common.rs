//! Common-ancestor searches and head reduction.

use std::collections::{BTreeMap, BTreeSet};

use ot_store::{Commit, CommitKey, CommitStore};

use super::OtAlgorithms;
use super::walker::GraphWalker;
use crate::algebra::OtDiff;
use crate::error::OtError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommonMode {
    /// Stop at the first commit every head reaches.
    Any,
    /// Stop once every frontier commit is reached by every head.
    All,
}

/// Tracks which start heads reach each not-yet-visited commit.
struct CommonParentWalker<K> {
    mode: CommonMode,
    heads: BTreeSet<K>,
    reached_by: BTreeMap<K, BTreeSet<K>>,
}

impl<K: CommitKey> CommonParentWalker<K> {
    fn new(mode: CommonMode, heads: &BTreeSet<K>) -> Self {
        Self {
            mode,
            heads: heads.clone(),
            reached_by: heads
                .iter()
                .map(|head| (head.clone(), BTreeSet::from([head.clone()])))
                .collect(),
        }
    }

    fn common(&self) -> Option<BTreeSet<K>> {
        match self.mode {
            CommonMode::Any => self
                .reached_by
                .iter()
                .find(|(_, heads)| **heads == self.heads)
                .map(|(node, _)| BTreeSet::from([node.clone()])),
            CommonMode::All => self
                .reached_by
                .values()
                .all(|heads| *heads == self.heads)
                .then(|| self.reached_by.keys().cloned().collect()),
        }
    }
}

impl<K: CommitKey, D> GraphWalker<K, D> for CommonParentWalker<K> {
    type Output = BTreeSet<K>;

    fn on_commit(&mut self, commit: &Commit<K, D>) -> Result<Option<BTreeSet<K>>, OtError> {
        if self.heads.len() == 1 {
            return Ok(Some(self.heads.clone()));
        }
        let reached = self.reached_by.remove(commit.id()).unwrap_or_default();
        for parent in commit.parent_ids() {
            self.reached_by
                .entry(parent.clone())
                .or_default()
                .extend(reached.iter().cloned());
        }
        Ok(self.common())
    }
}

/// Removes from the head set every commit found to be an ancestor of
/// another head.
struct ExcludeParentsWalker<K> {
    remaining: BTreeSet<K>,
    min_order: u64,
}

impl<K: CommitKey, D> GraphWalker<K, D> for ExcludeParentsWalker<K> {
    type Output = BTreeSet<K>;

    fn on_start(&mut self, heads: &[Commit<K, D>]) {
        self.min_order = heads.iter().map(Commit::order).min().unwrap_or(0);
    }

    fn on_commit(&mut self, commit: &Commit<K, D>) -> Result<Option<BTreeSet<K>>, OtError> {
        for parent in commit.parent_ids() {
            self.remaining.remove(parent);
        }
        Ok((commit.order() <= self.min_order).then(|| self.remaining.clone()))
    }
}

impl<S> OtAlgorithms<'_, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    /// The first commit reached from every one of `heads`.
    ///
    /// # Errors
    /// [`OtError::IncompleteGraph`] if the heads share no reachable ancestor.
    #[tracing::instrument(skip_all, fields(heads = heads.len()))]
    pub async fn find_any_common_parent(&self, heads: &BTreeSet<S::Id>) -> Result<S::Id, OtError> {
        let found = self
            .walk_graph(heads, CommonParentWalker::new(CommonMode::Any, heads))
            .await?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| OtError::incomplete("common parent search returned nothing"))
    }

    /// The frontier at which every pending commit is reached from all of
    /// `heads`.
    ///
    /// # Errors
    /// [`OtError::IncompleteGraph`] if the graph is exhausted first.
    #[tracing::instrument(skip_all, fields(heads = heads.len()))]
    pub async fn find_all_common_parents(
        &self,
        heads: &BTreeSet<S::Id>,
    ) -> Result<BTreeSet<S::Id>, OtError> {
        self.walk_graph(heads, CommonParentWalker::new(CommonMode::All, heads))
            .await
    }

    /// Drop every head that is an ancestor of another head.
    ///
    /// The walk stops at the first commit not newer than the oldest head, so
    /// only heads above that point can be recognised as ancestors.
    ///
    /// # Errors
    /// [`OtError::EmptyHeads`] for an empty set, store failures otherwise.
    #[tracing::instrument(skip_all, fields(heads = heads.len()))]
    pub async fn exclude_parents(&self, heads: &BTreeSet<S::Id>) -> Result<BTreeSet<S::Id>, OtError> {
        match heads.len() {
            0 => Err(OtError::EmptyHeads),
            1 => Ok(heads.clone()),
            _ => {
                let walker = ExcludeParentsWalker {
                    remaining: heads.clone(),
                    min_order: 0,
                };
                self.walk_graph(heads, walker).await
            }
        }
    }
}
