//! Priority-ordered graph walk.
//!
//! Commits are visited in descending `(order, id)`, so every child reachable
//! from the start heads is offered before any of its parents. After each
//! visit, all not-yet-seen parents of the visited commit are loaded as one
//! concurrent batch before the walk resumes.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashSet};

use futures::future::try_join_all;
use ot_store::{Commit, CommitKey, CommitStore};

use crate::error::OtError;

/// Per-traversal state machine driven by
/// [`OtAlgorithms::walk_graph`](super::OtAlgorithms::walk_graph).
pub trait GraphWalker<K: CommitKey, D> {
    /// Value produced when the walk succeeds.
    type Output;

    /// Called once with the loaded head commits before any visit.
    fn on_start(&mut self, _heads: &[Commit<K, D>]) {}

    /// Offer the next commit. Returning `Some` ends the walk.
    ///
    /// # Errors
    /// Any error aborts the walk and is returned to the caller unchanged.
    fn on_commit(&mut self, commit: &Commit<K, D>) -> Result<Option<Self::Output>, OtError>;
}

/// Heap entry ordered by `(order, id)`.
struct Queued<K: Ord, D>(Commit<K, D>);

impl<K: Ord, D> PartialEq for Queued<K, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord, D> Eq for Queued<K, D> {}

impl<K: Ord, D> PartialOrd for Queued<K, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, D> Ord for Queued<K, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .order()
            .cmp(&other.0.order())
            .then_with(|| self.0.id().cmp(other.0.id()))
    }
}

/// Loaded-but-unvisited commits plus the set of ids ever enqueued.
pub(crate) struct Frontier<K: CommitKey, D> {
    queue: BinaryHeap<Queued<K, D>>,
    seen: HashSet<K>,
    max_commits: Option<usize>,
}

impl<K: CommitKey, D: Clone> Frontier<K, D> {
    /// Load `heads` and queue them. Returns the head commits as well, for
    /// [`GraphWalker::on_start`].
    pub(crate) async fn seed<S>(
        store: &S,
        heads: &BTreeSet<K>,
        max_commits: Option<usize>,
    ) -> Result<(Self, Vec<Commit<K, D>>), OtError>
    where
        S: CommitStore<Id = K, Diff = D>,
    {
        let commits = try_join_all(heads.iter().map(|id| store.load_commit(id))).await?;
        let mut frontier = Self {
            queue: BinaryHeap::with_capacity(commits.len()),
            seen: heads.iter().cloned().collect(),
            max_commits,
        };
        frontier.check_bound()?;
        frontier.queue.extend(commits.iter().cloned().map(Queued));
        Ok((frontier, commits))
    }

    /// Take the highest-ordered commit.
    pub(crate) fn pop(&mut self) -> Option<Commit<K, D>> {
        self.queue.pop().map(|queued| queued.0)
    }

    /// The queued commits, in no particular order.
    pub(crate) fn commits(&self) -> impl Iterator<Item = &Commit<K, D>> {
        self.queue.iter().map(|queued| &queued.0)
    }

    /// Load every parent of `commit` not seen before and queue them.
    pub(crate) async fn enqueue_parents<S>(
        &mut self,
        store: &S,
        commit: &Commit<K, D>,
    ) -> Result<(), OtError>
    where
        S: CommitStore<Id = K, Diff = D>,
    {
        let unseen: Vec<&K> = commit
            .parent_ids()
            .filter(|parent| self.seen.insert((*parent).clone()))
            .collect();
        if unseen.is_empty() {
            return Ok(());
        }
        self.check_bound()?;
        let parents = try_join_all(unseen.into_iter().map(|id| store.load_commit(id))).await?;
        tracing::trace!(commit = %commit.id(), loaded = parents.len(), "loaded parents");
        self.queue.extend(parents.into_iter().map(Queued));
        Ok(())
    }

    fn check_bound(&self) -> Result<(), OtError> {
        match self.max_commits {
            Some(max) if self.seen.len() > max => Err(OtError::incomplete(format!(
                "walk exceeded the limit of {max} commits"
            ))),
            _ => Ok(()),
        }
    }
}
