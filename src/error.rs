//! Engine error type.
//!
//! [`OtError`] separates three failure classes callers handle differently:
//!
//! - **wiring** errors (missing or duplicate algebra registrations) are
//!   deployment defects and must never be retried;
//! - **domain** errors (incomplete graph, unresolvable merge) are legitimate
//!   under partial replication and may be retried or escalated;
//! - **store** errors are propagated unchanged from the
//!   [`CommitStore`](ot_store::CommitStore).

use ot_store::StoreError;
use thiserror::Error;

/// Errors returned by the diff algebra and the graph algorithms.
#[derive(Debug, Error)]
pub enum OtError {
    /// No transform function is registered for an encountered kind pair.
    #[error("no transform registered for ({left}, {right})")]
    MissingTransform {
        /// Kind of the left diff.
        left: String,
        /// Kind of the right diff.
        right: String,
    },

    /// No invert function is registered for an encountered kind.
    #[error("no invert function registered for {kind}")]
    MissingInvert {
        /// The diff kind.
        kind: String,
    },

    /// The same pairing was registered twice.
    #[error("duplicate {function} registration for {kinds}")]
    DuplicateRegistration {
        /// Which table the duplicate was found in (`transform`, `squash`, ...).
        function: &'static str,
        /// The kind or kind pair.
        kinds: String,
    },

    /// The walk exhausted the reachable graph without satisfying its goal.
    #[error("incomplete graph: {detail}")]
    IncompleteGraph {
        /// What the walk was looking for.
        detail: String,
    },

    /// A conflict surfaced during an N-way merge that pairwise transformation
    /// cannot reconcile without discarding several heads' work.
    #[error("unresolvable merge conflict merging head {head}: {detail}")]
    MergeConflict {
        /// The head being rebased when the conflict surfaced.
        head: String,
        /// Description of the losing side.
        detail: String,
    },

    /// An operation that needs at least one head was given none.
    #[error("no heads to operate on")]
    EmptyHeads,

    /// The commit store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OtError {
    /// `true` for registration defects. These are never worth retrying.
    #[must_use]
    pub const fn is_wiring(&self) -> bool {
        matches!(
            self,
            Self::MissingTransform { .. }
                | Self::MissingInvert { .. }
                | Self::DuplicateRegistration { .. }
        )
    }

    /// `true` when re-reading heads and redoing the computation can succeed:
    /// a stale-head push rejection or a graph that was not yet fully
    /// replicated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::IncompleteGraph { .. } => true,
            Self::Store(e) => e.is_stale_heads(),
            _ => false,
        }
    }

    pub(crate) fn incomplete(detail: impl Into<String>) -> Self {
        Self::IncompleteGraph {
            detail: detail.into(),
        }
    }
}
