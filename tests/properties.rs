//! Algebraic and traversal properties over generated inputs.

mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::{CounterOp, Graph, add, apply, counter_system, set};
use ot_store::{Commit, CommitId};
use otsync::{GraphWalker, OtAlgorithms, OtError};
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum Edit {
    Add(i64),
    Set(i64),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![(-5i64..=5).prop_map(Edit::Add), (0i64..20).prop_map(Edit::Set)]
}

/// Turn edits into diffs whose `Set::prev` matches the state it applies to.
fn materialize(start: i64, edits: &[Edit]) -> Vec<CounterOp> {
    let mut state = start;
    edits
        .iter()
        .map(|edit| {
            let op = match *edit {
                Edit::Add(delta) => add(delta),
                Edit::Set(next) => set(state, next),
            };
            state = apply(state, &[op]);
            op
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn transform_reaches_one_state(
        start in -10i64..10,
        left in prop::collection::vec(arb_edit(), 0..6),
        right in prop::collection::vec(arb_edit(), 0..6),
    ) {
        let system = counter_system();
        let left = materialize(start, &left);
        let right = materialize(start, &right);

        let t = system.transform(&left, &right).unwrap();
        let via_left = apply(apply(start, &left), &t.left);
        let via_right = apply(apply(start, &right), &t.right);
        prop_assert_eq!(via_left, via_right);
    }

    #[test]
    fn transform_mirrors(start in -10i64..10, left in arb_edit(), right in arb_edit()) {
        let system = counter_system();
        let left = materialize(start, &[left]);
        let right = materialize(start, &[right]);

        let forward = system.transform(&left, &right).unwrap();
        let backward = system.transform(&right, &left).unwrap();
        prop_assert_eq!(forward.left.clone(), backward.right.clone());
        prop_assert_eq!(forward.right, backward.left);
        prop_assert_eq!(
            forward.resolution,
            backward.resolution.map(|winner| winner.opposite())
        );
    }

    #[test]
    fn invert_undoes(
        start in -10i64..10,
        edits in prop::collection::vec(arb_edit(), 0..8),
    ) {
        let system = counter_system();
        let ops = materialize(start, &edits);
        let inverse = system.invert(&ops).unwrap();
        prop_assert_eq!(apply(apply(start, &ops), &inverse), start);
        prop_assert!(system.squash(&[ops, inverse].concat()).is_empty());
    }

    #[test]
    fn squash_keeps_effect(
        start in -10i64..10,
        edits in prop::collection::vec(arb_edit(), 0..8),
    ) {
        let system = counter_system();
        let ops = materialize(start, &edits);
        let squashed = system.squash(&ops);
        prop_assert!(squashed.len() <= 1);
        prop_assert_eq!(apply(start, &squashed), apply(start, &ops));
    }
}

struct Recorder<'a>(&'a mut Vec<Commit<CommitId, CounterOp>>);

impl GraphWalker<CommitId, CounterOp> for Recorder<'_> {
    type Output = ();

    fn on_commit(&mut self, commit: &Commit<CommitId, CounterOp>) -> Result<Option<()>, OtError> {
        self.0.push(commit.clone());
        Ok(None)
    }
}

const NAMES: [&str; 8] = ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"];

/// Commit `i` picks its parents among commits `0..i`.
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (2usize..=NAMES.len()).prop_flat_map(|n| {
        (1..n)
            .map(|i| prop::collection::btree_set(0..i, 1..=i.min(3)))
            .collect::<Vec<_>>()
            .prop_map(|sets| {
                sets.into_iter()
                    .map(|parents| parents.into_iter().collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn walk_offers_children_first(dag in arb_dag()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (seen, expected) = runtime.block_on(async {
            let mut g = Graph::new();
            g.root(NAMES[0]).await;
            for (i, parents) in dag.iter().enumerate() {
                let edges: Vec<_> = parents.iter().map(|&p| (NAMES[p], vec![add(1)])).collect();
                g.commit(NAMES[i + 1], &edges).await;
            }
            let heads = g.heads().await;
            let system = counter_system();
            let algorithms = OtAlgorithms::new(&g.store, &system);
            let mut seen = Vec::new();
            let err = algorithms.walk_graph(&heads, Recorder(&mut seen)).await.unwrap_err();
            assert!(matches!(err, OtError::IncompleteGraph { .. }));
            (seen, dag.len() + 1)
        });

        prop_assert_eq!(seen.len(), expected);
        let position: BTreeMap<CommitId, usize> =
            seen.iter().enumerate().map(|(i, c)| (*c.id(), i)).collect();
        prop_assert_eq!(position.len(), expected);
        for commit in &seen {
            for parent in commit.parent_ids() {
                prop_assert!(position[commit.id()] < position[parent]);
            }
        }
        prop_assert!(seen.windows(2).all(|w| w[0].order() >= w[1].order()));
    }
}

/// Work done by commit `k`: a single-parent commit adds `1 << k`, the root
/// and merge commits add nothing.
fn work(dag: &[Vec<usize>], k: usize) -> i64 {
    match k.checked_sub(1).map(|i| dag[i].len()) {
        Some(1) => 1 << k,
        _ => 0,
    }
}

/// Counter value at every commit: the work of all its ancestors.
fn states(dag: &[Vec<usize>]) -> Vec<i64> {
    let mut ancestors: Vec<BTreeSet<usize>> = vec![BTreeSet::from([0])];
    for (i, parents) in dag.iter().enumerate() {
        let mut own: BTreeSet<usize> = parents
            .iter()
            .flat_map(|&p| ancestors[p].iter().copied())
            .collect();
        own.insert(i + 1);
        ancestors.push(own);
    }
    ancestors
        .iter()
        .map(|own| own.iter().map(|&k| work(dag, k)).sum())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn merge_counts_every_commit_once(dag in arb_dag()) {
        let states = states(&dag);
        let expected: i64 = (0..=dag.len()).map(|k| work(&dag, k)).sum();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let merged_state = runtime.block_on(async {
            let mut g = Graph::new();
            g.root(NAMES[0]).await;
            for (i, parents) in dag.iter().enumerate() {
                let edges: Vec<_> = parents
                    .iter()
                    .map(|&p| (NAMES[p], vec![add(states[i + 1] - states[p])]))
                    .collect();
                g.commit(NAMES[i + 1], &edges).await;
            }
            let system = counter_system();
            let algorithms = OtAlgorithms::new(&g.store, &system);
            let merged = algorithms.merge_heads_and_push().await.unwrap();
            assert_eq!(g.heads().await, BTreeSet::from([merged]));
            apply(0, &algorithms.checkout(&merged).await.unwrap())
        });
        prop_assert_eq!(merged_state, expected);
    }
}
