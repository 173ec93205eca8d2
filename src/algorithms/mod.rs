//! Traversals over the commit graph held by a [`CommitStore`].
//!
//! Every algorithm here is a [`GraphWalker`] driven by
//! [`OtAlgorithms::walk_graph`]: commits are offered in descending
//! `(order, id)` so children are always seen before their parents.
//!
//! | Operation                  | Result                                    |
//! |----------------------------|-------------------------------------------|
//! | `find_parent`              | first matching ancestor + folded diffs    |
//! | `checkout`                 | materialized state of one head            |
//! | `find_cut`                 | frontier accepted by a predicate          |
//! | `find_any_common_parent`   | one commit reached by every head          |
//! | `find_all_common_parents`  | frontier fully reached by every head      |
//! | `exclude_parents`          | heads minus ancestors of other heads      |
//! | `reduce_edges`             | per-head diffs down to an ancestor        |
//! | `load_graph`               | in-memory subgraph for merging            |
//! | `merge_heads_and_push`     | one merge commit over all current heads   |
//!
//! No algorithm keeps state between calls.

mod common;
mod cut;
mod find;
mod merge;
mod reduce;
mod reducer;
mod walker;

use std::collections::BTreeSet;

use ot_store::CommitStore;

pub use find::FindResult;
pub use reducer::{DiffsReducer, ListReducer};
pub use walker::GraphWalker;

use crate::algebra::{OtDiff, OtSystem};
use crate::config::EngineConfig;
use crate::error::OtError;
use walker::Frontier;

/// Graph algorithms bound to one store and one diff algebra.
pub struct OtAlgorithms<'a, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    store: &'a S,
    system: &'a OtSystem<S::Diff>,
    config: EngineConfig,
}

impl<'a, S> OtAlgorithms<'a, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    #[must_use]
    pub fn new(store: &'a S, system: &'a OtSystem<S::Diff>) -> Self {
        Self {
            store,
            system,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &'a S {
        self.store
    }

    #[must_use]
    pub const fn system(&self) -> &'a OtSystem<S::Diff> {
        self.system
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drive `walker` over the graph below `heads`.
    ///
    /// # Errors
    /// - [`OtError::IncompleteGraph`] if the walk runs out of commits, or
    ///   exceeds `walk.max_commits`, before the walker produces a result.
    /// - store failures and anything the walker returns.
    pub async fn walk_graph<W>(&self, heads: &BTreeSet<S::Id>, mut walker: W) -> Result<W::Output, OtError>
    where
        W: GraphWalker<S::Id, S::Diff>,
    {
        let (mut frontier, head_commits) =
            Frontier::seed(self.store, heads, self.config.walk.max_commits).await?;
        walker.on_start(&head_commits);

        let mut visited = 0usize;
        while let Some(commit) = frontier.pop() {
            visited += 1;
            if let Some(output) = walker.on_commit(&commit)? {
                tracing::debug!(visited, "walk finished");
                return Ok(output);
            }
            frontier.enqueue_parents(self.store, &commit).await?;
        }
        Err(OtError::incomplete(format!(
            "walk from {} heads exhausted the loaded graph after {visited} commits",
            heads.len()
        )))
    }
}
