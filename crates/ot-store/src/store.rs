//! The [`CommitStore`] trait, the abstraction boundary between the OT engine
//! and durable commit storage.
//!
//! | Group     | Methods                                  |
//! |-----------|------------------------------------------|
//! | Graph     | `load_commit`, `get_heads`               |
//! | Write     | `create_commit`, `push`                  |
//! | Snapshots | `load_snapshot`, `save_snapshot`         |
//!
//! All methods are async. The engine issues loads for sibling parents
//! concurrently, so implementations must tolerate overlapping calls.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Display};
use std::hash::Hash;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::Commit;

/// Bounds every commit id type must satisfy.
///
/// Ids are compared (for deterministic fold and tie-break order), hashed, and
/// rendered into error messages and logs.
pub trait CommitKey: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> CommitKey for T where T: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}

/// Durable, append-only storage for the commit graph.
///
/// Implementations may be backed by a database, an object store, or the
/// in-memory [`MemoryStore`](crate::MemoryStore).
///
/// # Concurrency contract
///
/// [`push`](Self::push) is the only mutation the engine relies on for
/// correctness: it must atomically check that every parent of the pushed
/// commit is still a current head, and reject with
/// [`StoreError::StaleHeads`] otherwise.
#[async_trait]
pub trait CommitStore: Send + Sync {
    /// Commit identifier.
    type Id: CommitKey;

    /// Application diff type stored on edges.
    type Diff: Clone + Debug + Send + Sync + 'static;

    /// Load a commit by id.
    ///
    /// Returns [`StoreError::NotFound`] if the id is unknown.
    async fn load_commit(&self, id: &Self::Id) -> Result<Commit<Self::Id, Self::Diff>, StoreError>;

    /// The current heads: commits with no known children.
    async fn get_heads(&self) -> Result<BTreeSet<Self::Id>, StoreError>;

    /// Build (but do not persist) a commit with the given parent edges and
    /// order. The id policy is store-defined.
    async fn create_commit(
        &self,
        parents: BTreeMap<Self::Id, Vec<Self::Diff>>,
        order: u64,
    ) -> Result<Commit<Self::Id, Self::Diff>, StoreError>;

    /// Durably append a commit.
    ///
    /// Retry-safe: pushing a commit that is already stored succeeds without
    /// effect. Rejects with [`StoreError::StaleHeads`] if any parent is no
    /// longer a current head.
    async fn push(&self, commit: Commit<Self::Id, Self::Diff>) -> Result<(), StoreError>;

    /// Load the full replayable state saved for a snapshot commit.
    ///
    /// Returns [`StoreError::SnapshotNotFound`] if none was saved.
    async fn load_snapshot(&self, id: &Self::Id) -> Result<Vec<Self::Diff>, StoreError>;

    /// Save the full replayable state of a commit.
    async fn save_snapshot(&self, id: &Self::Id, diffs: Vec<Self::Diff>) -> Result<(), StoreError>;
}
