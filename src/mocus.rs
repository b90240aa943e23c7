//! Minimal cut sets by top-down gate substitution (MOCUS).
//!
//! Candidate cut sets are kept as *paths*: lists of tree nodes that must all
//! occur. Starting from the single path `[top]`, the first gate of the first
//! expandable path is rewritten until every path holds only basic events:
//!
//! - **AND** splices its children into the path in place;
//! - **OR** replaces the path by one path per child, `[child] + rest`;
//! - **K-out-of-N** replaces the path by one path per `k`-subset of its
//!   children, each subset spliced in as for AND.
//!
//! The finished paths are turned into sets, sorted by size, and every set
//! that contains an earlier one is dropped. What remains are the minimal cut
//! sets.
//!
//! # Complexity
//!
//! The number of paths is exponential in the width of the tree in the worst
//! case: an AND of `m` ORs with `w` children each yields `w^m` paths, and a
//! `k`-of-`n` gate alone yields `C(n, k)`. [`candidate_bound`] computes the
//! number of paths an expansion produces before any pruning, and
//! [`MocusConfig`] can cap the work.

use std::collections::{BTreeSet, HashMap, VecDeque};

use log::{debug, trace};
use num_bigint::BigUint;

use crate::cutset::MinimalCutSet;
use crate::error::{Error, Result};
use crate::tree::{FaultTree, GateKind, Node};
use crate::types::NodeId;
use crate::utils::{binomial, k_subsets};

/// Configuration options for cut-set enumeration.
///
/// Use `MocusConfig::default()` for an exact, unbounded enumeration.
#[derive(Debug, Clone, Default)]
pub struct MocusConfig {
    /// Discard candidates with more than this many distinct basic events
    /// (default: `None`, keep all). Minimal cut sets up to this order are
    /// still all found.
    pub max_order: Option<usize>,
    /// Fail with [`Error::PathLimitExceeded`] once more than this many paths
    /// are alive at the same time (default: `None`, no limit).
    pub max_paths: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Mocus {
    config: MocusConfig,
}

impl Mocus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MocusConfig) -> Self {
        Self { config }
    }

    /// Computes the minimal cut sets of `tree`, smallest first.
    pub fn minimal_cut_sets(&self, tree: &FaultTree) -> Result<Vec<MinimalCutSet>> {
        if tree.is_empty() {
            return Ok(Vec::new());
        }

        let paths = self.expand(tree)?;
        let candidates = paths.len();

        let mut sets: Vec<BTreeSet<NodeId>> = paths.into_iter().map(|path| path.into_iter().collect()).collect();
        sets.sort_by_key(BTreeSet::len);

        let mut minimal: Vec<BTreeSet<NodeId>> = Vec::new();
        for set in sets {
            if !minimal.iter().any(|kept| kept.is_subset(&set)) {
                minimal.push(set);
            }
        }

        debug!(
            "MOCUS: {} candidate paths, {} minimal cut sets",
            candidates,
            minimal.len()
        );
        minimal.into_iter().map(MinimalCutSet::from_events).collect()
    }

    /// Rewrites paths until they contain only basic events.
    fn expand(&self, tree: &FaultTree) -> Result<Vec<Vec<NodeId>>> {
        let mut pending: VecDeque<Vec<NodeId>> = VecDeque::from([vec![tree.root()]]);
        let mut done: Vec<Vec<NodeId>> = Vec::new();

        while let Some(path) = pending.pop_front() {
            if let Some(limit) = self.config.max_paths {
                if pending.len() + done.len() + 1 > limit {
                    return Err(Error::PathLimitExceeded { limit });
                }
            }

            let first_gate = path
                .iter()
                .enumerate()
                .find_map(|(position, &id)| tree.gate(id).map(|gate| (position, gate)));
            let Some((position, gate)) = first_gate else {
                done.push(path);
                continue;
            };

            let mut rest = path;
            rest.remove(position);

            match gate.kind() {
                GateKind::And => {
                    let expanded = splice(&rest, position, gate.children());
                    if self.admissible(tree, &expanded) {
                        pending.push_front(expanded);
                    }
                }
                GateKind::Or => {
                    for &child in gate.children() {
                        let expanded = splice(&rest, 0, &[child]);
                        if self.admissible(tree, &expanded) {
                            pending.push_back(expanded);
                        }
                    }
                }
                GateKind::KofN(k) => {
                    let children = gate.children();
                    trace!(
                        "expanding {}-of-{} gate `{}` into {} paths",
                        k,
                        children.len(),
                        gate.name(),
                        binomial(children.len() as u64, k as u64)
                    );
                    for subset in k_subsets(children.len(), k as usize) {
                        let chosen: Vec<NodeId> = subset.iter().map(|&i| children[i]).collect();
                        let expanded = splice(&rest, position, &chosen);
                        if self.admissible(tree, &expanded) {
                            pending.push_back(expanded);
                        }
                    }
                }
            }
        }

        Ok(done)
    }

    /// Whether a path can still lead to a cut set within `max_order`.
    fn admissible(&self, tree: &FaultTree, path: &[NodeId]) -> bool {
        match self.config.max_order {
            None => true,
            Some(max_order) => {
                path.iter().filter(|&&id| tree.node(id).is_basic_event()).count() <= max_order
            }
        }
    }
}

/// Inserts `items` into `path` at `position`, skipping nodes already present.
fn splice(path: &[NodeId], position: usize, items: &[NodeId]) -> Vec<NodeId> {
    let mut result = Vec::with_capacity(path.len() + items.len());
    result.extend_from_slice(&path[..position]);
    for &item in items {
        if !path.contains(&item) && !result.contains(&item) {
            result.push(item);
        }
    }
    result.extend_from_slice(&path[position..]);
    result
}

/// Number of paths a full expansion of `tree` generates before any
/// deduplication or truncation.
pub fn candidate_bound(tree: &FaultTree) -> BigUint {
    if tree.is_empty() {
        return BigUint::ZERO;
    }
    let mut memo = HashMap::new();
    bound_of(tree, tree.root(), &mut memo)
}

fn bound_of(tree: &FaultTree, id: NodeId, memo: &mut HashMap<NodeId, BigUint>) -> BigUint {
    if let Some(bound) = memo.get(&id) {
        return bound.clone();
    }
    let bound = match tree.node(id) {
        Node::Basic(_) => BigUint::from(1u32),
        Node::Gate(gate) => {
            let counts: Vec<BigUint> = gate
                .children()
                .iter()
                .map(|&child| bound_of(tree, child, memo))
                .collect();
            match gate.kind() {
                GateKind::And => counts.iter().product(),
                GateKind::Or => counts.iter().sum(),
                GateKind::KofN(k) => elementary_symmetric(&counts, k as usize),
            }
        }
    };
    memo.insert(id, bound.clone());
    bound
}

/// Sum over all `k`-subsets of the product of their members.
fn elementary_symmetric(values: &[BigUint], k: usize) -> BigUint {
    // e[j] holds the sum over j-subsets of the prefix seen so far.
    let mut e = vec![BigUint::ZERO; k + 1];
    e[0] = BigUint::from(1u32);
    for value in values {
        for j in (1..=k).rev() {
            let term = &e[j - 1] * value;
            e[j] += term;
        }
    }
    e.swap_remove(k)
}

impl FaultTree {
    /// Minimal cut sets of this tree with the default configuration.
    pub fn minimal_cut_sets(&self) -> Result<Vec<MinimalCutSet>> {
        Mocus::new().minimal_cut_sets(self)
    }

    pub fn minimal_cut_sets_with_config(&self, config: &MocusConfig) -> Result<Vec<MinimalCutSet>> {
        Mocus::with_config(config.clone()).minimal_cut_sets(self)
    }
}
