//! Counter diffs for unit tests.

use crate::algebra::{ConflictResolution, OtDiff, OtSystem, TransformResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestOp {
    Add(i64),
    Set { prev: i64, next: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TestKind {
    Add,
    Set,
}

impl OtDiff for TestOp {
    type Kind = TestKind;

    fn kind(&self) -> TestKind {
        match self {
            Self::Add(_) => TestKind::Add,
            Self::Set { .. } => TestKind::Set,
        }
    }
}

pub const fn add(delta: i64) -> TestOp {
    TestOp::Add(delta)
}

pub const fn set(prev: i64, next: i64) -> TestOp {
    TestOp::Set { prev, next }
}

pub fn apply(state: i64, ops: &[TestOp]) -> i64 {
    ops.iter().fold(state, |state, op| match *op {
        TestOp::Add(delta) => state + delta,
        TestOp::Set { next, .. } => next,
    })
}

/// Registered for (Add, Add), (Add, Set) and (Set, Set); the builder
/// derives (Set, Add).
fn transform_pair(left: &TestOp, right: &TestOp) -> TransformResult<TestOp> {
    match (*left, *right) {
        (TestOp::Add(_), TestOp::Add(_)) => TransformResult::of(vec![*right], vec![*left]),
        (TestOp::Add(delta), TestOp::Set { prev, next }) => {
            TransformResult::of(vec![set(prev + delta, next)], vec![])
        }
        (TestOp::Set { next: a, .. }, TestOp::Set { next: b, .. }) if a == b => {
            TransformResult::empty()
        }
        (TestOp::Set { next: a, .. }, TestOp::Set { next: b, .. }) if a > b => {
            TransformResult::conflict(ConflictResolution::Left)
        }
        _ => TransformResult::conflict(ConflictResolution::Right),
    }
}

/// (Add, Set) is left unregistered so squashing it keeps both diffs.
fn squash_pair(first: &TestOp, second: &TestOp) -> Option<TestOp> {
    match (*first, *second) {
        (TestOp::Add(x), TestOp::Add(y)) => Some(add(x + y)),
        (TestOp::Set { prev, .. }, TestOp::Set { next, .. }) => Some(set(prev, next)),
        (TestOp::Set { prev, next }, TestOp::Add(delta)) => Some(set(prev, next + delta)),
        (TestOp::Add(_), TestOp::Set { .. }) => None,
    }
}

fn invert_one(op: &TestOp) -> Vec<TestOp> {
    match *op {
        TestOp::Add(delta) => vec![add(-delta)],
        TestOp::Set { prev, next } => vec![set(next, prev)],
    }
}

fn is_noop(op: &TestOp) -> bool {
    match *op {
        TestOp::Add(delta) => delta == 0,
        TestOp::Set { prev, next } => prev == next,
    }
}

/// Concurrent sets conflict; the larger value wins.
pub fn system() -> OtSystem<TestOp> {
    OtSystem::builder()
        .transform(TestKind::Add, TestKind::Add, transform_pair)
        .transform(TestKind::Add, TestKind::Set, transform_pair)
        .transform(TestKind::Set, TestKind::Set, transform_pair)
        .squash(TestKind::Add, TestKind::Add, squash_pair)
        .squash(TestKind::Set, TestKind::Set, squash_pair)
        .squash(TestKind::Set, TestKind::Add, squash_pair)
        .invert(TestKind::Add, invert_one)
        .invert(TestKind::Set, invert_one)
        .empty_predicate(TestKind::Add, is_noop)
        .empty_predicate(TestKind::Set, is_noop)
        .build()
        .expect("test algebra has no duplicate registrations")
}
