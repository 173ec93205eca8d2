//! Graph loading and the merge-and-push entry point.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use ot_store::{Commit, CommitKey, CommitStore};
use tracing::instrument;

use super::OtAlgorithms;
use super::walker::GraphWalker;
use crate::algebra::OtDiff;
use crate::error::OtError;
use crate::graph::LoadedGraph;

/// Loads commits into a [`LoadedGraph`] until the heads converge.
///
/// Each head tracks the set of unexpanded frontier nodes (and true roots) it
/// reaches; each such node tracks the heads reaching it. The walk stops when
/// every head reaches the whole frontier.
struct LoadGraphWalker<K: CommitKey, D> {
    graph: LoadedGraph<K, D>,
    head_roots: BTreeMap<K, BTreeSet<K>>,
    root_heads: BTreeMap<K, BTreeSet<K>>,
    max_head_order: u64,
}

impl<K: CommitKey, D: Clone + std::fmt::Debug> LoadGraphWalker<K, D> {
    fn new() -> Self {
        Self {
            graph: LoadedGraph::new(),
            head_roots: BTreeMap::new(),
            root_heads: BTreeMap::new(),
            max_head_order: 0,
        }
    }

    fn converged(&self) -> bool {
        !self.head_roots.is_empty()
            && self.head_roots.values().all(|roots| {
                roots.len() == self.root_heads.len()
                    && roots.iter().all(|root| self.root_heads.contains_key(root))
            })
    }
}

impl<K: CommitKey, D: Clone + std::fmt::Debug> GraphWalker<K, D> for LoadGraphWalker<K, D> {
    type Output = (LoadedGraph<K, D>, u64);

    fn on_start(&mut self, heads: &[Commit<K, D>]) {
        for head in heads {
            let id = head.id().clone();
            self.head_roots.insert(id.clone(), BTreeSet::from([id.clone()]));
            self.root_heads.insert(id.clone(), BTreeSet::from([id]));
            self.max_head_order = self.max_head_order.max(head.order());
        }
    }

    fn on_commit(&mut self, commit: &Commit<K, D>) -> Result<Option<Self::Output>, OtError> {
        let node = commit.id();
        self.graph.set_node_timestamp(node.clone(), commit.timestamp());

        let affected = self.root_heads.remove(node).unwrap_or_default();
        for head in &affected {
            if let Some(roots) = self.head_roots.get_mut(head) {
                roots.remove(node);
            }
        }

        // A true root stays in the frontier as itself.
        let next: Vec<K> = if commit.is_root() {
            vec![node.clone()]
        } else {
            commit.parent_ids().cloned().collect()
        };
        for parent in &next {
            for root in self.graph.find_roots(parent) {
                for head in &affected {
                    self.head_roots
                        .entry(head.clone())
                        .or_default()
                        .insert(root.clone());
                }
                self.root_heads
                    .entry(root)
                    .or_default()
                    .extend(affected.iter().cloned());
            }
        }
        for (parent, diffs) in commit.parents() {
            self.graph.add_edge(parent.clone(), node.clone(), diffs.clone());
        }

        if self.converged() {
            tracing::debug!(
                nodes = self.graph.nodes().count(),
                frontier = self.root_heads.len(),
                "graph loaded"
            );
            return Ok(Some((mem::take(&mut self.graph), self.max_head_order)));
        }
        Ok(None)
    }
}

impl<S> OtAlgorithms<'_, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    /// Load the part of the commit graph the `heads` need to be merged: walk
    /// down until every head reaches the same frontier.
    ///
    /// # Errors
    /// [`OtError::IncompleteGraph`] if the heads never converge.
    #[instrument(skip_all, fields(heads = heads.len()))]
    pub async fn load_graph(
        &self,
        heads: &BTreeSet<S::Id>,
    ) -> Result<LoadedGraph<S::Id, S::Diff>, OtError> {
        let (graph, _) = self.walk_graph(heads, LoadGraphWalker::new()).await?;
        Ok(graph)
    }

    /// Merge every current head into one commit and push it.
    ///
    /// With a single head nothing is written and that head is returned.
    /// Nothing is persisted unless the final push succeeds.
    ///
    /// # Errors
    /// - [`OtError::EmptyHeads`] if the store has no commits.
    /// - [`OtError::IncompleteGraph`] / [`OtError::MergeConflict`] from the
    ///   merge itself.
    /// - [`OtError::Store`] with a stale-heads rejection if another writer
    ///   advanced the heads meanwhile ([`OtError::is_retryable`]).
    #[instrument(skip_all)]
    pub async fn merge_heads_and_push(&self) -> Result<S::Id, OtError> {
        let heads = self.store.get_heads().await?;
        if heads.len() == 1
            && let Some(head) = heads.first()
        {
            tracing::debug!(head = %head, "single head, nothing to merge");
            return Ok(head.clone());
        }
        self.merge_and_push(&heads).await
    }

    async fn merge_and_push(&self, heads: &BTreeSet<S::Id>) -> Result<S::Id, OtError> {
        if heads.is_empty() {
            return Err(OtError::EmptyHeads);
        }
        let (graph, max_order) = self.walk_graph(heads, LoadGraphWalker::new()).await?;
        if self.config.merge.dump_graph {
            tracing::debug!(graph = %graph.to_graphviz(), "loaded merge graph");
        }

        let edges = graph.merge(self.system, heads)?;
        let commit = self.store.create_commit(edges, max_order + 1).await?;
        let id = commit.id().clone();
        let parents = commit.parents().len();

        if let Err(err) = self.store.push(commit).await {
            if err.is_stale_heads() {
                tracing::warn!(commit = %id, "merge commit rejected, heads moved");
            }
            return Err(err.into());
        }
        tracing::info!(commit = %id, parents, order = max_order + 1, "pushed merge commit");
        Ok(id)
    }
}
