//! In-place reductions of fault trees.
//!
//! [`TreeCutter`] restricts a tree to a set of basic events, which isolates
//! the contribution of one minimal cut set. [`NodeChanger`] swaps the fault
//! mode wrapped by a basic event, e.g. for one that has surely occurred.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;

use crate::fault::InternalFaultMode;
use crate::tree::{FaultTree, GateKind, Node};
use crate::types::NodeId;

/// Prunes a fault tree down to the basic events whose names are retained.
///
/// - A basic event is retained iff its name is in the set.
/// - An AND gate is retained iff all its children are.
/// - An OR gate drops its non-retained children and is retained iff any remain.
/// - A K-out-of-N gate drops its non-retained children and is retained iff
///   at least `k` remain.
///
/// Reducing twice with the same set leaves the tree as the first pass did.
#[derive(Debug, Clone)]
pub struct TreeCutter {
    retained: HashSet<String>,
}

impl TreeCutter {
    pub fn new<I, S>(retained: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            retained: retained.into_iter().map(Into::into).collect(),
        }
    }

    /// Reduces the whole tree; returns whether the top event is retained.
    pub fn reduce(&self, tree: &mut FaultTree) -> bool {
        if tree.is_empty() {
            return false;
        }
        let root = tree.root();
        self.visit(tree, root)
    }

    /// Reduces the sub-tree below `node`; returns whether `node` is retained.
    pub fn visit(&self, tree: &mut FaultTree, node: NodeId) -> bool {
        let mut memo = HashMap::new();
        self.visit_node(tree, node, &mut memo)
    }

    fn visit_node(&self, tree: &mut FaultTree, node: NodeId, memo: &mut HashMap<NodeId, bool>) -> bool {
        if let Some(&retained) = memo.get(&node) {
            return retained;
        }

        let (kind, children) = match tree.node(node) {
            Node::Basic(event) => {
                let retained = self.retained.contains(event.name());
                memo.insert(node, retained);
                return retained;
            }
            Node::Gate(gate) => (gate.kind(), gate.children().to_vec()),
        };

        let retained = match kind {
            GateKind::And => children.iter().all(|&child| self.visit_node(tree, child, memo)),
            GateKind::Or | GateKind::KofN(_) => {
                let kept: Vec<NodeId> = children
                    .into_iter()
                    .filter(|&child| self.visit_node(tree, child, memo))
                    .collect();
                let count = kept.len();
                if let Node::Gate(gate) = tree.node_mut(node) {
                    gate.children = kept;
                }
                match kind {
                    GateKind::KofN(k) => count >= k as usize,
                    _ => count > 0,
                }
            }
        };

        trace!("gate `{}` retained: {}", tree.name(node), retained);
        memo.insert(node, retained);
        retained
    }
}

/// Substitutes the fault mode of a basic event.
pub struct NodeChanger;

impl NodeChanger {
    /// Replaces the fault mode of the first basic event (breadth-first from
    /// the root) named `name`, returning the fault mode it wrapped before.
    pub fn substitute(tree: &mut FaultTree, name: &str, replacement: InternalFaultMode) -> Option<InternalFaultMode> {
        if tree.is_empty() {
            return None;
        }
        let mut queue = VecDeque::from([tree.root()]);
        let mut seen = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            match tree.node_mut(id) {
                Node::Basic(event) if event.name() == name => {
                    return Some(event.replace_fault(replacement));
                }
                Node::Basic(_) => {}
                Node::Gate(gate) => queue.extend(gate.children().iter().copied()),
            }
        }
        None
    }
}
