//! The registration table and the list-level algebra built on it.
//!
//! Registered functions work on single diffs; [`OtSystem`] lifts them to
//! lists:
//!
//! - `transform` splits both lists recursively down to single pairs. A
//!   conflict on any pair aborts the whole list transform, which is then
//!   resolved by rolling back the losing side.
//! - `squash` folds adjacent pairs greedily from the left and drops diffs the
//!   empty predicates recognise.
//! - `invert` inverts each diff and reverses the list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::result::{ConflictResolution, TransformResult, Transformed};
use super::OtDiff;
use crate::error::OtError;

type TransformFn<D> = Arc<dyn Fn(&D, &D) -> TransformResult<D> + Send + Sync>;
type SquashFn<D> = Arc<dyn Fn(&D, &D) -> Option<D> + Send + Sync>;
type InvertFn<D> = Arc<dyn Fn(&D) -> Vec<D> + Send + Sync>;
type EmptyFn<D> = Arc<dyn Fn(&D) -> bool + Send + Sync>;

type KindPair<D> = (<D as OtDiff>::Kind, <D as OtDiff>::Kind);

// ---------------------------------------------------------------------------
// OtSystem
// ---------------------------------------------------------------------------

/// Immutable algebra over diff lists.
///
/// Construct once with [`OtSystem::builder`] and share by reference.
pub struct OtSystem<D: OtDiff> {
    transformers: HashMap<KindPair<D>, TransformFn<D>>,
    squashers: HashMap<KindPair<D>, SquashFn<D>>,
    inverters: HashMap<D::Kind, InvertFn<D>>,
    empty_predicates: HashMap<D::Kind, EmptyFn<D>>,
}

impl<D: OtDiff> fmt::Debug for OtSystem<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtSystem")
            .field("transformers", &self.transformers.keys().collect::<Vec<_>>())
            .field("squashers", &self.squashers.keys().collect::<Vec<_>>())
            .field("inverters", &self.inverters.keys().collect::<Vec<_>>())
            .field(
                "empty_predicates",
                &self.empty_predicates.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<D: OtDiff> OtSystem<D> {
    /// Start an empty registration table.
    #[must_use]
    pub fn builder() -> OtSystemBuilder<D> {
        OtSystemBuilder {
            system: Self {
                transformers: HashMap::new(),
                squashers: HashMap::new(),
                inverters: HashMap::new(),
                empty_predicates: HashMap::new(),
            },
            duplicate: None,
        }
    }

    /// `true` if the empty predicate registered for the diff's kind says so.
    /// Kinds without a predicate are never empty.
    #[must_use]
    pub fn is_empty(&self, diff: &D) -> bool {
        self.empty_predicates
            .get(&diff.kind())
            .is_some_and(|predicate| predicate(diff))
    }

    /// Transform two diff lists that apply to the same state.
    ///
    /// On success, applying `left` then `result.left` reaches the same state
    /// as applying `right` then `result.right`. Conflicts are resolved in
    /// favour of the winning side: the winner's replacement is empty and the
    /// loser's replacement undoes the loser's diffs, then replays the
    /// winner's.
    ///
    /// # Errors
    /// [`OtError::MissingTransform`] or [`OtError::MissingInvert`] when a kind
    /// encountered on the way has no registration.
    pub fn transform(&self, left: &[D], right: &[D]) -> Result<Transformed<D>, OtError> {
        match self.transform_lists(left, right)? {
            TransformResult::Transformed { left, right } => Ok(Transformed {
                left,
                right,
                resolution: None,
            }),
            TransformResult::Conflict(ConflictResolution::Left) => Ok(Transformed {
                left: Vec::new(),
                right: self.rollback(right, left)?,
                resolution: Some(ConflictResolution::Left),
            }),
            TransformResult::Conflict(ConflictResolution::Right) => Ok(Transformed {
                left: self.rollback(left, right)?,
                right: Vec::new(),
                resolution: Some(ConflictResolution::Right),
            }),
        }
    }

    /// `squash(invert(loser) ++ winner)`
    fn rollback(&self, loser: &[D], winner: &[D]) -> Result<Vec<D>, OtError> {
        let mut diffs = self.invert(loser)?;
        diffs.extend_from_slice(winner);
        Ok(self.squash(&diffs))
    }

    fn transform_lists(&self, left: &[D], right: &[D]) -> Result<TransformResult<D>, OtError> {
        match (left, right) {
            ([], []) => Ok(TransformResult::empty()),
            ([], _) => Ok(TransformResult::of(right.to_vec(), Vec::new())),
            (_, []) => Ok(TransformResult::of(Vec::new(), left.to_vec())),
            ([single], [first, rest @ ..]) => {
                let (mut left1, right1) = match self.transform_pair(single, first)?.into_pair() {
                    Ok(pair) => pair,
                    Err(winner) => return Ok(TransformResult::Conflict(winner)),
                };
                let (left2, right2) = match self.transform_lists(&right1, rest)?.into_pair() {
                    Ok(pair) => pair,
                    Err(winner) => return Ok(TransformResult::Conflict(winner)),
                };
                left1.extend(left2);
                Ok(TransformResult::of(left1, right2))
            }
            ([first, rest @ ..], _) => {
                let (left1, mut right1) =
                    match self.transform_lists(std::slice::from_ref(first), right)?.into_pair() {
                        Ok(pair) => pair,
                        Err(winner) => return Ok(TransformResult::Conflict(winner)),
                    };
                let (left2, right2) = match self.transform_lists(rest, &left1)?.into_pair() {
                    Ok(pair) => pair,
                    Err(winner) => return Ok(TransformResult::Conflict(winner)),
                };
                right1.extend(right2);
                Ok(TransformResult::of(left2, right1))
            }
        }
    }

    fn transform_pair(&self, left: &D, right: &D) -> Result<TransformResult<D>, OtError> {
        let key = (left.kind(), right.kind());
        let transformer = self
            .transformers
            .get(&key)
            .ok_or_else(|| OtError::MissingTransform {
                left: format!("{:?}", key.0),
                right: format!("{:?}", key.1),
            })?;
        Ok(transformer(left, right))
    }

    /// Coalesce adjacent diffs where a squash function is registered and
    /// accepts the pair, dropping diffs recognised as empty.
    #[must_use]
    pub fn squash(&self, diffs: &[D]) -> Vec<D> {
        let mut result = Vec::with_capacity(diffs.len());
        let mut iter = diffs.iter();
        let Some(first) = iter.next() else {
            return result;
        };
        let mut current = first.clone();
        for next in iter {
            let squashed = self
                .squashers
                .get(&(current.kind(), next.kind()))
                .and_then(|squasher| squasher(&current, next));
            if let Some(squashed) = squashed {
                current = squashed;
            } else {
                let done = std::mem::replace(&mut current, next.clone());
                if !self.is_empty(&done) {
                    result.push(done);
                }
            }
        }
        if !self.is_empty(&current) {
            result.push(current);
        }
        result
    }

    /// Diffs that undo `diffs`: per-element inverses in reverse order.
    ///
    /// # Errors
    /// [`OtError::MissingInvert`] if a diff's kind has no invert function.
    pub fn invert(&self, diffs: &[D]) -> Result<Vec<D>, OtError> {
        let mut result = Vec::with_capacity(diffs.len());
        for diff in diffs.iter().rev() {
            let inverter =
                self.inverters
                    .get(&diff.kind())
                    .ok_or_else(|| OtError::MissingInvert {
                        kind: format!("{:?}", diff.kind()),
                    })?;
            result.extend(inverter(diff));
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects registrations for an [`OtSystem`].
///
/// Registration methods chain; the first duplicate is reported by
/// [`build`](Self::build).
pub struct OtSystemBuilder<D: OtDiff> {
    system: OtSystem<D>,
    duplicate: Option<OtError>,
}

impl<D: OtDiff> OtSystemBuilder<D> {
    /// Register the transform for `(left, right)`.
    ///
    /// For `left != right` the mirrored `(right, left)` pairing is derived
    /// automatically by swapping the arguments and the result sides
    /// (including the conflict winner). Registering it again is a duplicate.
    #[must_use]
    pub fn transform<F>(mut self, left: D::Kind, right: D::Kind, f: F) -> Self
    where
        F: Fn(&D, &D) -> TransformResult<D> + Send + Sync + 'static,
    {
        let f: TransformFn<D> = Arc::new(f);
        if left != right {
            let forward = Arc::clone(&f);
            let mirrored: TransformFn<D> = Arc::new(move |l, r| forward(r, l).swap());
            self.insert_transform((right, left), mirrored);
        }
        self.insert_transform((left, right), f);
        self
    }

    fn insert_transform(&mut self, key: KindPair<D>, f: TransformFn<D>) {
        if self.system.transformers.contains_key(&key) {
            self.record_duplicate("transform", format!("{key:?}"));
        } else {
            self.system.transformers.insert(key, f);
        }
    }

    /// Register the squash function for the adjacent pair `(first, second)`.
    ///
    /// The function returns `None` to decline a particular pair.
    #[must_use]
    pub fn squash<F>(mut self, first: D::Kind, second: D::Kind, f: F) -> Self
    where
        F: Fn(&D, &D) -> Option<D> + Send + Sync + 'static,
    {
        let key = (first, second);
        if self.system.squashers.contains_key(&key) {
            self.record_duplicate("squash", format!("{key:?}"));
        } else {
            self.system.squashers.insert(key, Arc::new(f));
        }
        self
    }

    /// Register the invert function for `kind`.
    #[must_use]
    pub fn invert<F>(mut self, kind: D::Kind, f: F) -> Self
    where
        F: Fn(&D) -> Vec<D> + Send + Sync + 'static,
    {
        if self.system.inverters.contains_key(&kind) {
            self.record_duplicate("invert", format!("{kind:?}"));
        } else {
            self.system.inverters.insert(kind, Arc::new(f));
        }
        self
    }

    /// Register the empty predicate for `kind`.
    #[must_use]
    pub fn empty_predicate<F>(mut self, kind: D::Kind, f: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        if self.system.empty_predicates.contains_key(&kind) {
            self.record_duplicate("empty predicate", format!("{kind:?}"));
        } else {
            self.system.empty_predicates.insert(kind, Arc::new(f));
        }
        self
    }

    fn record_duplicate(&mut self, function: &'static str, kinds: String) {
        if self.duplicate.is_none() {
            self.duplicate = Some(OtError::DuplicateRegistration { function, kinds });
        }
    }

    /// Finish registration.
    ///
    /// # Errors
    /// [`OtError::DuplicateRegistration`] for the first pairing registered
    /// twice.
    pub fn build(self) -> Result<OtSystem<D>, OtError> {
        match self.duplicate {
            Some(err) => Err(err),
            None => Ok(self.system),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
