//! Loaded graph and N-way merge.
//!
//! # Merge
//!
//! Heads that are ancestors of other heads are dropped, then the remaining
//! set is merged recursively:
//!
//! 1. Pick a pivot among the nodes that have loaded parents: single-parent
//!    commits first, then merge commits reaching the fewest frontier roots,
//!    largest id on ties.
//! 2. Merge the pivot's parents together with the other nodes.
//! 3. Rebase the pivot onto that result. A single-parent pivot transforms its
//!    edge against the path from its parent to the merged state; the left
//!    result becomes the pivot's edge, the right result extends every other
//!    node's edge. A merge-commit pivot carries no work of its own, so its
//!    edge is `invert(edge to parent) ++ path from parent to merged state`.
//!
//! Shared history is therefore applied exactly once, however the heads
//! branch and rejoin below their fork points. A conflict that would roll
//! back the merged work of two or more other nodes is reported as
//! [`OtError::MergeConflict`] instead of resolved.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Write as _};

use ot_store::CommitKey;

use crate::algebra::{ConflictResolution, OtDiff, OtSystem};
use crate::error::OtError;

/// Commits and edges visited so far, keyed by commit id.
#[derive(Clone, Debug)]
pub struct LoadedGraph<K: CommitKey, D> {
    child_to_parents: BTreeMap<K, BTreeMap<K, Vec<D>>>,
    parent_to_children: BTreeMap<K, BTreeSet<K>>,
    timestamps: BTreeMap<K, u64>,
}

impl<K: CommitKey, D> Default for LoadedGraph<K, D> {
    fn default() -> Self {
        Self {
            child_to_parents: BTreeMap::new(),
            parent_to_children: BTreeMap::new(),
            timestamps: BTreeMap::new(),
        }
    }
}

impl<K: CommitKey, D: Clone + Debug> LoadedGraph<K, D> {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the edge `parent -> child` carrying `diffs`.
    pub fn add_edge(&mut self, parent: K, child: K, diffs: Vec<D>) {
        self.child_to_parents.entry(parent.clone()).or_default();
        self.parent_to_children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.child_to_parents
            .entry(child)
            .or_default()
            .insert(parent, diffs);
    }

    /// Record a node's commit timestamp. Also registers the node.
    pub fn set_node_timestamp(&mut self, node: K, timestamp: u64) {
        self.child_to_parents.entry(node.clone()).or_default();
        self.timestamps.insert(node, timestamp);
    }

    /// All loaded node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = &K> {
        self.child_to_parents.keys()
    }

    /// Loaded parent edges of `node`.
    #[must_use]
    pub fn parents(&self, node: &K) -> Option<&BTreeMap<K, Vec<D>>> {
        self.child_to_parents.get(node)
    }

    /// Loaded children of `node`.
    pub fn children(&self, node: &K) -> impl Iterator<Item = &K> {
        self.parent_to_children.get(node).into_iter().flatten()
    }

    /// Timestamp recorded for `node`.
    #[must_use]
    pub fn timestamp(&self, node: &K) -> Option<u64> {
        self.timestamps.get(node).copied()
    }

    /// Loaded nodes without loaded parents that are reachable from `node`.
    ///
    /// A node with no loaded parents (or not loaded at all) is its own root.
    #[must_use]
    pub fn find_roots(&self, node: &K) -> BTreeSet<K> {
        let mut roots = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            match self.child_to_parents.get(&current) {
                Some(parents) if !parents.is_empty() => stack.extend(parents.keys().cloned()),
                _ => {
                    roots.insert(current);
                }
            }
        }
        roots
    }

    /// `node` and every loaded node reachable from it through parent edges.
    #[must_use]
    pub fn ancestors(&self, node: &K) -> BTreeSet<K> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.child_to_parents.get(&current) {
                stack.extend(parents.keys().cloned());
            }
        }
        visited
    }

    /// Drop every head that is an ancestor of another head in the set.
    #[must_use]
    pub fn exclude_parents(&self, heads: &BTreeSet<K>) -> BTreeSet<K> {
        let mut excluded = BTreeSet::new();
        for head in heads {
            if excluded.contains(head) {
                continue;
            }
            let mut ancestors = self.ancestors(head);
            ancestors.remove(head);
            excluded.extend(ancestors.into_iter().filter(|a| heads.contains(a)));
        }
        heads.difference(&excluded).cloned().collect()
    }

    /// Diffs from `base` down to `node` along the first path found.
    fn path_from(&self, base: &K, node: &K, dead_ends: &mut BTreeSet<K>) -> Option<Vec<D>> {
        if node == base {
            return Some(Vec::new());
        }
        if dead_ends.contains(node) {
            return None;
        }
        for (parent, diffs) in self.child_to_parents.get(node)? {
            if let Some(mut path) = self.path_from(base, parent, dead_ends) {
                path.extend(diffs.iter().cloned());
                return Some(path);
            }
        }
        dead_ends.insert(node.clone());
        None
    }

    /// Render the loaded graph in DOT format, one edge per parent link,
    /// labelled with the edge's diffs.
    #[must_use]
    pub fn to_graphviz(&self) -> String {
        let mut dot = String::from("digraph {\n");
        for (child, parents) in &self.child_to_parents {
            if parents.is_empty() {
                let _ = writeln!(dot, "\t\"{child}\";");
            }
            for (parent, diffs) in parents {
                let label = format!("{diffs:?}").replace('"', "\\\"");
                let _ = writeln!(dot, "\t\"{parent}\" -> \"{child}\" [label=\"{label}\"];");
            }
        }
        dot.push('}');
        dot
    }
}

impl<K: CommitKey, D: OtDiff> LoadedGraph<K, D> {
    /// Merge `heads` into per-head edge diffs leading to one common state.
    ///
    /// Heads that are ancestors of other heads are dropped first; the result
    /// is keyed by the remaining heads.
    ///
    /// # Errors
    /// - [`OtError::EmptyHeads`] for an empty head set.
    /// - [`OtError::IncompleteGraph`] if the heads share no loaded ancestor.
    /// - [`OtError::MergeConflict`] if a conflict would roll back several
    ///   already-merged heads.
    /// - wiring errors from the algebra.
    pub fn merge(
        &self,
        system: &OtSystem<D>,
        heads: &BTreeSet<K>,
    ) -> Result<BTreeMap<K, Vec<D>>, OtError> {
        let heads = self.exclude_parents(heads);
        if heads.is_empty() {
            return Err(OtError::EmptyHeads);
        }
        tracing::debug!(heads = heads.len(), "merging heads");
        Ok(self
            .merge_nodes(system, &heads)?
            .into_iter()
            .map(|(head, edge)| {
                let squashed = system.squash(&edge);
                (head, squashed)
            })
            .collect())
    }

    /// Merge an antichain of loaded nodes by peeling off one pivot.
    fn merge_nodes(
        &self,
        system: &OtSystem<D>,
        nodes: &BTreeSet<K>,
    ) -> Result<BTreeMap<K, Vec<D>>, OtError> {
        if nodes.len() <= 1 {
            return Ok(nodes.iter().map(|node| (node.clone(), Vec::new())).collect());
        }

        let (pivot, parents) = nodes
            .iter()
            .filter_map(|node| {
                let parents = self.child_to_parents.get(node).filter(|p| !p.is_empty())?;
                Some((node, parents))
            })
            .min_by_key(|(node, parents)| {
                (parents.len() > 1, self.find_roots(node).len(), Reverse(*node))
            })
            .ok_or_else(|| {
                OtError::incomplete(format!("no common ancestor loaded for {} heads", nodes.len()))
            })?;
        let Some((parent, edge)) = parents.first_key_value() else {
            return Err(OtError::incomplete(format!("{pivot} has no loaded parents")));
        };

        let mut rest: BTreeSet<K> = nodes.iter().filter(|node| *node != pivot).cloned().collect();
        rest.extend(parents.keys().cloned());
        let rest = self.exclude_parents(&rest);
        let mut merged = self.merge_nodes(system, &rest)?;
        let to_merged = self.path_to_merged(parent, &merged)?;
        merged.retain(|node, _| nodes.contains(node));

        if parents.len() > 1 {
            let mut back = system.invert(edge)?;
            back.extend(to_merged);
            merged.insert(pivot.clone(), system.squash(&back));
            return Ok(merged);
        }

        let transformed = system.transform(edge, &to_merged)?;
        if transformed.resolution == Some(ConflictResolution::Left) && merged.len() > 1 {
            return Err(OtError::MergeConflict {
                head: pivot.to_string(),
                detail: format!("it would roll back {} merged heads", merged.len()),
            });
        }
        if let Some(winner) = transformed.resolution {
            tracing::debug!(head = %pivot, ?winner, "resolved conflict while merging head");
        }
        for other in merged.values_mut() {
            other.extend(transformed.right.iter().cloned());
        }
        merged.insert(pivot.clone(), transformed.left);
        Ok(merged)
    }

    /// Diffs from `from` to the state every node of `merged` converges on.
    fn path_to_merged(&self, from: &K, merged: &BTreeMap<K, Vec<D>>) -> Result<Vec<D>, OtError> {
        merged
            .iter()
            .find_map(|(node, edge)| {
                let mut path = self.path_from(from, node, &mut BTreeSet::new())?;
                path.extend(edge.iter().cloned());
                Some(path)
            })
            .ok_or_else(|| OtError::incomplete(format!("no loaded path from {from} to the merge")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
