//! Error types for commit store operations.
//!
//! [`StoreError`] is the single error type returned by all
//! [`CommitStore`](crate::CommitStore) methods. Ids are carried as their
//! display strings so the error stays independent of the store's key type.

use thiserror::Error;

/// Errors returned by [`CommitStore`](crate::CommitStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested commit is not in the store.
    #[error("commit {id} not found")]
    NotFound {
        /// Display form of the missing commit id.
        id: String,
    },

    /// No snapshot has been saved for the commit.
    #[error("no snapshot saved for commit {id}")]
    SnapshotNotFound {
        /// Display form of the commit id.
        id: String,
    },

    /// A push was rejected because some of the commit's parents are no longer
    /// current heads (compare-and-swap / optimistic concurrency failure).
    ///
    /// The caller should re-read the heads and redo the whole computation.
    #[error("push of {commit} rejected: parents no longer heads: {}", stale.join(", "))]
    StaleHeads {
        /// The commit that could not be pushed.
        commit: String,
        /// Parents that are not current heads.
        stale: Vec<String>,
    },

    /// A commit references a parent the store does not hold.
    #[error("commit {commit} references unknown parent {parent}")]
    MissingParent {
        /// The commit being stored.
        commit: String,
        /// The parent that is missing.
        parent: String,
    },

    /// A commit or its diffs could not be serialized for hashing.
    #[error("failed to serialize commit: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing store failed for a reason not covered above.
    #[error("store backend error: {message}")]
    Backend {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl StoreError {
    /// `true` for optimistic-concurrency rejections that a re-read and retry
    /// can resolve.
    #[must_use]
    pub const fn is_stale_heads(&self) -> bool {
        matches!(self, Self::StaleHeads { .. })
    }
}
