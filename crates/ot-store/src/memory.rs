//! In-memory, content-addressed [`CommitStore`].
//!
//! Commit ids are the SHA-256 of the canonical JSON of the commit's parent
//! edges, order, and a per-store creation sequence number. The sequence
//! number keeps two writers that produce identical edges from colliding.
//!
//! Heads are tracked the way a durable store would: appending a commit removes
//! its parents from the head set and adds the commit. [`CommitStore::push`]
//! enforces the compare-and-swap contract; [`MemoryStore::replicate`] skips
//! it, modelling commits arriving from another writer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::CommitStore;
use crate::types::{Commit, CommitId};

/// Hashed form of a commit: everything that determines its identity.
#[derive(Serialize)]
struct CanonicalCommit<'a, D> {
    parents: &'a BTreeMap<CommitId, Vec<D>>,
    order: u64,
    seq: u64,
}

struct Inner<D> {
    commits: HashMap<CommitId, Commit<CommitId, D>>,
    heads: BTreeSet<CommitId>,
    snapshots: HashMap<CommitId, Vec<D>>,
    seq: u64,
}

impl<D> Inner<D> {
    fn append(&mut self, commit: Commit<CommitId, D>) -> Result<(), StoreError> {
        if let Some(parent) = commit
            .parent_ids()
            .find(|parent| !self.commits.contains_key(*parent))
        {
            return Err(StoreError::MissingParent {
                commit: commit.id().to_string(),
                parent: parent.to_string(),
            });
        }
        for parent in commit.parent_ids() {
            self.heads.remove(parent);
        }
        self.heads.insert(*commit.id());
        self.commits.insert(*commit.id(), commit);
        Ok(())
    }
}

/// A commit store held entirely in memory.
pub struct MemoryStore<D> {
    inner: RwLock<Inner<D>>,
}

impl<D> Default for MemoryStore<D> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                commits: HashMap::new(),
                heads: BTreeSet::new(),
                snapshots: HashMap::new(),
                seq: 0,
            }),
        }
    }
}

impl<D> MemoryStore<D>
where
    D: Clone + Debug + Send + Sync + 'static,
{
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit produced elsewhere, without the stale-head check.
    ///
    /// Idempotent. Parents must already be stored.
    ///
    /// # Errors
    /// Returns [`StoreError::MissingParent`] if a parent is unknown.
    pub async fn replicate(&self, commit: Commit<CommitId, D>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.commits.contains_key(commit.id()) {
            return Ok(());
        }
        tracing::debug!(commit = %commit.id(), "replicating commit");
        inner.append(commit)
    }

    /// Number of stored commits.
    pub async fn len(&self) -> usize {
        self.inner.read().await.commits.len()
    }

    /// `true` if no commit has been stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.commits.is_empty()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[async_trait]
impl<D> CommitStore for MemoryStore<D>
where
    D: Clone + Debug + Serialize + Send + Sync + 'static,
{
    type Id = CommitId;
    type Diff = D;

    async fn load_commit(&self, id: &CommitId) -> Result<Commit<CommitId, D>, StoreError> {
        let inner = self.inner.read().await;
        let commit = inner
            .commits
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Ok(commit.clone().with_snapshot(inner.snapshots.contains_key(id)))
    }

    async fn get_heads(&self) -> Result<BTreeSet<CommitId>, StoreError> {
        Ok(self.inner.read().await.heads.clone())
    }

    async fn create_commit(
        &self,
        parents: BTreeMap<CommitId, Vec<D>>,
        order: u64,
    ) -> Result<Commit<CommitId, D>, StoreError> {
        let seq = {
            let mut inner = self.inner.write().await;
            inner.seq += 1;
            inner.seq
        };
        let canonical = serde_json::to_vec(&CanonicalCommit {
            parents: &parents,
            order,
            seq,
        })?;
        let id = CommitId::from_bytes(Sha256::digest(&canonical).into());
        Ok(Commit::new(id, parents, order).with_timestamp(now_millis()))
    }

    async fn push(&self, commit: Commit<CommitId, D>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.commits.contains_key(commit.id()) {
            return Ok(());
        }
        let stale: Vec<String> = commit
            .parent_ids()
            .filter(|parent| !inner.heads.contains(*parent))
            .map(ToString::to_string)
            .collect();
        if !stale.is_empty() {
            tracing::warn!(commit = %commit.id(), stale = stale.len(), "push rejected: stale heads");
            return Err(StoreError::StaleHeads {
                commit: commit.id().to_string(),
                stale,
            });
        }
        inner.append(commit)
    }

    async fn load_snapshot(&self, id: &CommitId) -> Result<Vec<D>, StoreError> {
        self.inner
            .read()
            .await
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::SnapshotNotFound { id: id.to_string() })
    }

    async fn save_snapshot(&self, id: &CommitId, diffs: Vec<D>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.commits.contains_key(id) {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        inner.snapshots.insert(*id, diffs);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn root(store: &MemoryStore<i64>) -> CommitId {
        let commit = store.create_commit(BTreeMap::new(), 0).await.unwrap();
        let id = *commit.id();
        store.push(commit).await.unwrap();
        id
    }

    async fn child(store: &MemoryStore<i64>, parent: CommitId, diff: i64) -> Commit<CommitId, i64> {
        let order = store.load_commit(&parent).await.unwrap().order() + 1;
        store
            .create_commit(BTreeMap::from([(parent, vec![diff])]), order)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_commit_does_not_persist() {
        let store = MemoryStore::<i64>::new();
        let commit = store.create_commit(BTreeMap::new(), 0).await.unwrap();
        assert!(store.is_empty().await);
        let err = store.load_commit(commit.id()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn identical_edges_get_distinct_ids() {
        let store = MemoryStore::<i64>::new();
        let a = store.create_commit(BTreeMap::new(), 0).await.unwrap();
        let b = store.create_commit(BTreeMap::new(), 0).await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn push_replaces_parent_head() {
        let store = MemoryStore::<i64>::new();
        let a = root(&store).await;
        assert_eq!(store.get_heads().await.unwrap(), BTreeSet::from([a]));

        let b = child(&store, a, 1).await;
        let b_id = *b.id();
        store.push(b).await.unwrap();
        assert_eq!(store.get_heads().await.unwrap(), BTreeSet::from([b_id]));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn push_rejects_stale_parent() {
        let store = MemoryStore::<i64>::new();
        let a = root(&store).await;
        let b = child(&store, a, 1).await;
        let c = child(&store, a, 2).await;
        store.push(b).await.unwrap();

        let err = store.push(c).await.unwrap_err();
        assert!(err.is_stale_heads());
        assert!(err.to_string().contains(&a.to_string()));
    }

    #[tokio::test]
    async fn push_is_retry_safe() {
        let store = MemoryStore::<i64>::new();
        let a = root(&store).await;
        let b = child(&store, a, 1).await;
        store.push(b.clone()).await.unwrap();
        store.push(b).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn replicate_allows_branching() {
        let store = MemoryStore::<i64>::new();
        let a = root(&store).await;
        let b = child(&store, a, 1).await;
        let c = child(&store, a, 2).await;
        let (b_id, c_id) = (*b.id(), *c.id());
        store.replicate(b).await.unwrap();
        store.replicate(c).await.unwrap();
        assert_eq!(store.get_heads().await.unwrap(), BTreeSet::from([b_id, c_id]));
    }

    #[tokio::test]
    async fn replicate_requires_known_parents() {
        let store = MemoryStore::<i64>::new();
        let orphan = Commit::new(
            CommitId::from_bytes([2; 32]),
            BTreeMap::from([(CommitId::from_bytes([1; 32]), vec![1])]),
            1,
        );
        let err = store.replicate(orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));
    }

    #[tokio::test]
    async fn snapshot_flag_follows_saved_snapshots() {
        let store = MemoryStore::<i64>::new();
        let a = root(&store).await;
        assert!(!store.load_commit(&a).await.unwrap().is_snapshot());
        assert!(matches!(
            store.load_snapshot(&a).await.unwrap_err(),
            StoreError::SnapshotNotFound { .. }
        ));

        store.save_snapshot(&a, vec![7]).await.unwrap();
        assert!(store.load_commit(&a).await.unwrap().is_snapshot());
        assert_eq!(store.load_snapshot(&a).await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn save_snapshot_for_unknown_commit_fails() {
        let store = MemoryStore::<i64>::new();
        let err = store
            .save_snapshot(&CommitId::from_bytes([9; 32]), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
