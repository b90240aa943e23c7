//! Properties that hold for every model: minimality and completeness of the
//! cut sets, exact K-out-of-N expansion, and idempotent reduction.

use std::collections::BTreeSet;

use test_log::test;

use faultflow::builder::reduce_tree;
use faultflow::cutset::MinimalCutSet;
use faultflow::model::System;
use faultflow::tree::FaultTree;
use faultflow::types::NodeId;
use faultflow::utils::{binomial, k_subsets};

const ACTIVATIONS: &[&str] = &[
    "A",
    "A || (B && C)",
    "(A || B) && (A || C)",
    "(A && B) || (A && B && C)",
    "2/3(A, B, C) && (D || A)",
    "3/4(A, B, C, D) || (A && E)",
    "2/3(A || B, C, D && E)",
    "1/2(A, B) && 2/2(C, D)",
    "(A || B) && (C || D) && (E || A)",
];

fn single_component(activation: &str) -> (System, FaultTree) {
    let mut system = System::new("props");
    let c = system.add_component("C").unwrap();
    let fail = system.add_failure_mode("Fail").unwrap();
    let em = system.add_error_mode(c, "Top", activation, fail, None).unwrap();
    let tree = system.fault_tree(em).unwrap();
    (system, tree)
}

/// Same activations, but every leaf is reached through a propagation port
/// from its own upstream component.
fn propagated(activation: &str) -> FaultTree {
    let mut system = System::new("props");
    let top_component = system.add_component("Top").unwrap();
    let fail = system.add_failure_mode("Fail").unwrap();
    let rewritten = ["A", "B", "C", "D", "E"]
        .iter()
        .fold(activation.to_string(), |acc, name| acc.replace(name, &format!("In{}", name)));
    let top = system
        .add_error_mode(top_component, "TopErr", &rewritten, fail, None)
        .unwrap();
    for name in ["A", "B", "C", "D", "E"] {
        let Some(input) = system.faults().lookup(&format!("In{}", name)) else {
            continue;
        };
        let upstream = system.add_component(&format!("Up{}", name)).unwrap();
        let up_fail = system.add_failure_mode(&format!("Up{}Fail", name)).unwrap();
        system
            .add_error_mode(upstream, &format!("Up{}Err", name), name, up_fail, None)
            .unwrap();
        system
            .add_propagation_port(upstream, up_fail, input, top_component, 1.0)
            .unwrap();
    }
    system.fault_tree(top).unwrap()
}

fn triggers(tree: &FaultTree, events: &BTreeSet<NodeId>) -> bool {
    tree.evaluate(&|id| events.contains(&id))
}

fn check_minimal_and_complete(tree: &FaultTree, cut_sets: &[MinimalCutSet], context: &str) {
    for cs in cut_sets {
        let events: BTreeSet<NodeId> = cs.iter().collect();
        assert!(triggers(tree, &events), "{}: {} does not trigger", context, cs.display(tree));
        for removed in cs.iter() {
            let mut fewer = events.clone();
            fewer.remove(&removed);
            assert!(
                !triggers(tree, &fewer),
                "{}: {} is not minimal",
                context,
                cs.display(tree)
            );
        }
    }
    for (i, a) in cut_sets.iter().enumerate() {
        for (j, b) in cut_sets.iter().enumerate() {
            assert!(i == j || !a.is_subset(b), "{}: {:?} within {:?}", context, a, b);
        }
    }

    // Every triggering assignment contains some cut set.
    let events = tree.basic_events();
    for mask in 0u32..(1 << events.len()) {
        let occurred: BTreeSet<NodeId> = events
            .iter()
            .enumerate()
            .filter(|&(i, _)| mask & (1 << i) != 0)
            .map(|(_, &id)| id)
            .collect();
        let covered = cut_sets.iter().any(|cs| cs.iter().all(|id| occurred.contains(&id)));
        assert_eq!(triggers(tree, &occurred), covered, "{}: mask {:b}", context, mask);
    }
}

#[test]
fn test_cut_sets_are_minimal_and_complete() {
    for &activation in ACTIVATIONS {
        let (_, tree) = single_component(activation);
        let cut_sets = tree.minimal_cut_sets().unwrap();
        check_minimal_and_complete(&tree, &cut_sets, activation);
    }
}

#[test]
fn test_propagation_preserves_cut_sets() {
    for &activation in ACTIVATIONS {
        let (_, direct) = single_component(activation);
        let through_ports = propagated(activation);

        let names = |tree: &FaultTree| {
            let mut names: Vec<Vec<String>> = tree
                .minimal_cut_sets()
                .unwrap()
                .iter()
                .map(|cs| cs.names(tree))
                .collect();
            names.sort();
            names
        };
        assert_eq!(names(&direct), names(&through_ports), "{}", activation);

        let cut_sets = through_ports.minimal_cut_sets().unwrap();
        check_minimal_and_complete(&through_ports, &cut_sets, activation);
    }
}

#[test]
fn test_k_of_n_is_exactly_all_k_subsets() {
    for n in 1..=6u32 {
        for k in 1..=n {
            let leaves: Vec<String> = (0..n).map(|i| format!("X{}", i)).collect();
            let activation = format!("{}/{}({})", k, n, leaves.join(","));
            let (_, tree) = single_component(&activation);
            let cut_sets = tree.minimal_cut_sets().unwrap();

            assert_eq!(
                cut_sets.len() as u64,
                u64::try_from(binomial(n as u64, k as u64)).unwrap(),
                "{}",
                activation
            );

            let mut actual: Vec<Vec<String>> = cut_sets.iter().map(|cs| cs.names(&tree)).collect();
            actual.sort();
            let mut expected: Vec<Vec<String>> = k_subsets(n as usize, k as usize)
                .into_iter()
                .map(|subset| {
                    let mut names: Vec<String> = subset.into_iter().map(|i| leaves[i].clone()).collect();
                    names.sort();
                    names
                })
                .collect();
            expected.sort();
            assert_eq!(actual, expected, "{}", activation);
        }
    }
}

#[test]
fn test_reduce_is_idempotent() {
    for &activation in ACTIVATIONS {
        let (_, tree) = single_component(activation);
        let names: Vec<String> = tree.basic_events().iter().map(|&id| tree.name(id).to_string()).collect();
        // Every prefix of the event list as the retained set.
        for len in 0..=names.len() {
            let retained = &names[..len];
            let mut once = tree.clone();
            let first = reduce_tree(retained, &mut once);
            let mut twice = once.clone();
            let second = reduce_tree(retained, &mut twice);
            assert_eq!(once, twice, "{} / {:?}", activation, retained);
            assert_eq!(first, second, "{} / {:?}", activation, retained);
        }
    }
}

#[test]
fn test_reduced_tree_keeps_only_retained_cut_sets() {
    for &activation in ACTIVATIONS {
        let (_, tree) = single_component(activation);
        for cs in tree.minimal_cut_sets().unwrap() {
            let retained = cs.names(&tree);
            let mut reduced = tree.clone();
            assert!(reduce_tree(&retained, &mut reduced), "{}", activation);
            let remaining = reduced.minimal_cut_sets().unwrap();
            assert!(
                remaining.iter().any(|r| r.names(&reduced) == retained),
                "{}: {:?} lost",
                activation,
                retained
            );
            for r in &remaining {
                assert!(r.names(&reduced).iter().all(|name| retained.contains(name)));
            }
        }
    }
}
