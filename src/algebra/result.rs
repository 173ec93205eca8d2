//! Transform outcomes.

/// Which side wins a conflicting transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConflictResolution {
    /// The left diffs are kept; the right side is rolled back.
    Left,
    /// The right diffs are kept; the left side is rolled back.
    Right,
}

impl ConflictResolution {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Raw result of transforming two diff lists that apply to the same state.
///
/// Returned by registered transform functions and by the recursive list
/// transform before conflicts are resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransformResult<D> {
    /// Non-conflicting replacements. `left` is applied on top of the left
    /// input's state, `right` on top of the right input's state; both reach
    /// the same state.
    Transformed {
        /// Diffs to apply after the left input.
        left: Vec<D>,
        /// Diffs to apply after the right input.
        right: Vec<D>,
    },
    /// The inputs conflict and one side must win.
    Conflict(ConflictResolution),
}

impl<D> TransformResult<D> {
    /// Both sides already agree.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Transformed {
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Non-conflicting result.
    #[must_use]
    pub const fn of(left: Vec<D>, right: Vec<D>) -> Self {
        Self::Transformed { left, right }
    }

    /// Conflict won by `winner`.
    #[must_use]
    pub const fn conflict(winner: ConflictResolution) -> Self {
        Self::Conflict(winner)
    }

    /// `true` for [`TransformResult::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Mirror the result: what a transform of `(right, left)` would return.
    #[must_use]
    pub fn swap(self) -> Self {
        match self {
            Self::Transformed { left, right } => Self::Transformed {
                left: right,
                right: left,
            },
            Self::Conflict(winner) => Self::Conflict(winner.opposite()),
        }
    }

    /// Split into `(left, right)`, or the winning side on conflict.
    pub(crate) fn into_pair(self) -> Result<(Vec<D>, Vec<D>), ConflictResolution> {
        match self {
            Self::Transformed { left, right } => Ok((left, right)),
            Self::Conflict(winner) => Err(winner),
        }
    }
}

/// Fully resolved transform, as returned by
/// [`OtSystem::transform`](crate::algebra::OtSystem::transform).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transformed<D> {
    /// Diffs to apply after the left input.
    pub left: Vec<D>,
    /// Diffs to apply after the right input.
    pub right: Vec<D>,
    /// The winner, if a conflict had to be resolved.
    pub resolution: Option<ConflictResolution>,
}
