//! Shared fixtures for the integration tests.
//!
//! A counter whose state is an `i64`, edited by `Add` and `Set` diffs, and a
//! [`Graph`] helper that builds named commit DAGs in a [`MemoryStore`].
//! Concurrent branches are created with `replicate`, the way commits from
//! other writers would arrive.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use ot_store::{CommitId, CommitStore, MemoryStore};
use otsync::{ConflictResolution, OtDiff, OtSystem, TransformResult};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CounterOp {
    Add(i64),
    /// `prev` is the state the set was made against.
    Set { prev: i64, next: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Add,
    Set,
}

impl OtDiff for CounterOp {
    type Kind = CounterKind;

    fn kind(&self) -> CounterKind {
        match self {
            Self::Add(_) => CounterKind::Add,
            Self::Set { .. } => CounterKind::Set,
        }
    }
}

pub const fn add(delta: i64) -> CounterOp {
    CounterOp::Add(delta)
}

pub const fn set(prev: i64, next: i64) -> CounterOp {
    CounterOp::Set { prev, next }
}

/// Replay `ops` on top of `state`.
pub fn apply(state: i64, ops: &[CounterOp]) -> i64 {
    ops.iter().fold(state, |state, op| match op {
        CounterOp::Add(delta) => state + delta,
        CounterOp::Set { next, .. } => *next,
    })
}

/// Counter algebra. Two concurrent sets conflict and the larger value wins.
pub fn counter_system() -> OtSystem<CounterOp> {
    OtSystem::builder()
        .transform(CounterKind::Add, CounterKind::Add, |l, r| {
            TransformResult::of(vec![*r], vec![*l])
        })
        .transform(CounterKind::Add, CounterKind::Set, |l, r| match (l, r) {
            (CounterOp::Add(delta), CounterOp::Set { prev, next }) => {
                TransformResult::of(vec![set(prev + delta, *next)], vec![])
            }
            _ => unreachable!(),
        })
        .transform(CounterKind::Set, CounterKind::Set, |l, r| match (l, r) {
            (CounterOp::Set { next: a, .. }, CounterOp::Set { next: b, .. }) if a == b => {
                TransformResult::empty()
            }
            (CounterOp::Set { next: a, .. }, CounterOp::Set { next: b, .. }) if a > b => {
                TransformResult::conflict(ConflictResolution::Left)
            }
            _ => TransformResult::conflict(ConflictResolution::Right),
        })
        .squash(CounterKind::Add, CounterKind::Add, |a, b| match (a, b) {
            (CounterOp::Add(x), CounterOp::Add(y)) => Some(add(x + y)),
            _ => None,
        })
        .squash(CounterKind::Set, CounterKind::Set, |a, b| match (a, b) {
            (CounterOp::Set { prev, .. }, CounterOp::Set { next, .. }) => Some(set(*prev, *next)),
            _ => None,
        })
        .squash(CounterKind::Add, CounterKind::Set, |a, b| match (a, b) {
            (CounterOp::Add(delta), CounterOp::Set { prev, next }) => {
                Some(set(prev - delta, *next))
            }
            _ => None,
        })
        .squash(CounterKind::Set, CounterKind::Add, |a, b| match (a, b) {
            (CounterOp::Set { prev, next }, CounterOp::Add(delta)) => {
                Some(set(*prev, next + delta))
            }
            _ => None,
        })
        .invert(CounterKind::Add, |op| match op {
            CounterOp::Add(delta) => vec![add(-delta)],
            CounterOp::Set { .. } => unreachable!(),
        })
        .invert(CounterKind::Set, |op| match op {
            CounterOp::Set { prev, next } => vec![set(*next, *prev)],
            CounterOp::Add(_) => unreachable!(),
        })
        .empty_predicate(CounterKind::Add, |op| matches!(op, CounterOp::Add(0)))
        .empty_predicate(CounterKind::Set, |op| {
            matches!(op, CounterOp::Set { prev, next } if prev == next)
        })
        .build()
        .expect("counter algebra registers each function once")
}

/// Named commits in a [`MemoryStore`].
#[derive(Default)]
pub struct Graph {
    pub store: MemoryStore<CounterOp>,
    ids: BTreeMap<&'static str, CommitId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a root commit.
    pub async fn root(&mut self, name: &'static str) -> CommitId {
        let commit = self.store.create_commit(BTreeMap::new(), 0).await.unwrap();
        let id = *commit.id();
        self.store.push(commit).await.unwrap();
        self.ids.insert(name, id);
        id
    }

    /// Append a commit with one edge per `(parent, diffs)`, ordered one past
    /// its highest parent. Bypasses the head check so branches can diverge.
    pub async fn commit(
        &mut self,
        name: &'static str,
        edges: &[(&'static str, Vec<CounterOp>)],
    ) -> CommitId {
        let mut parents = BTreeMap::new();
        let mut order = 0;
        for (parent, diffs) in edges {
            let parent_id = self.id(parent);
            let parent_order = self.store.load_commit(&parent_id).await.unwrap().order();
            order = order.max(parent_order + 1);
            parents.insert(parent_id, diffs.clone());
        }
        let commit = self.store.create_commit(parents, order).await.unwrap();
        let id = *commit.id();
        self.store.replicate(commit).await.unwrap();
        self.ids.insert(name, id);
        id
    }

    pub fn id(&self, name: &str) -> CommitId {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("no commit named {name}"))
    }

    pub fn set_of(&self, names: &[&str]) -> BTreeSet<CommitId> {
        names.iter().map(|name| self.id(name)).collect()
    }

    pub async fn heads(&self) -> BTreeSet<CommitId> {
        self.store.get_heads().await.unwrap()
    }

    pub async fn snapshot(&self, name: &str, state: Vec<CounterOp>) {
        self.store.save_snapshot(&self.id(name), state).await.unwrap();
    }
}
