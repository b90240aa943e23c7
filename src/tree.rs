//! Fault trees as node arenas.
//!
//! A [`FaultTree`] stores its nodes in a `Vec` and links them by [`NodeId`].
//! Sharing is explicit: a basic event (or an unrolled upstream error mode)
//! reached along several branches is one node with several parents, so the
//! "same event" question is an index comparison.
//!
//! Trees are derived data. The [builder][crate::builder] produces a fresh one
//! for every analysis, and the [reducers][crate::reduce] mutate it in place.

use std::collections::VecDeque;

use crate::fault::InternalFaultMode;
use crate::types::{ErrorModeId, FaultModeId, NodeId};

/// Leaf of a fault tree: the occurrence of one internal fault mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicEvent {
    fault_id: FaultModeId,
    fault: InternalFaultMode,
}

impl BasicEvent {
    pub fn new(fault_id: FaultModeId, fault: InternalFaultMode) -> Self {
        Self { fault_id, fault }
    }

    /// Name of the wrapped fault mode, which doubles as the event name.
    pub fn name(&self) -> &str {
        &self.fault.name
    }

    pub fn fault_id(&self) -> FaultModeId {
        self.fault_id
    }

    pub fn fault(&self) -> &InternalFaultMode {
        &self.fault
    }

    /// Swaps the wrapped fault mode, returning the previous one.
    pub fn replace_fault(&mut self, fault: InternalFaultMode) -> InternalFaultMode {
        std::mem::replace(&mut self.fault, fault)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GateKind {
    And,
    Or,
    /// Fires when at least `k` children fire.
    KofN(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    kind: GateKind,
    name: String,
    pub(crate) children: Vec<NodeId>,
    error_mode: Option<ErrorModeId>,
    routing_probability: Option<f64>,
}

impl Gate {
    pub fn new(kind: GateKind, name: impl Into<String>, children: Vec<NodeId>) -> Self {
        Self {
            kind,
            name: name.into(),
            children,
            error_mode: None,
            routing_probability: None,
        }
    }

    /// Marks this gate as the boundary of an error mode.
    pub fn with_error_mode(mut self, error_mode: ErrorModeId) -> Self {
        self.error_mode = Some(error_mode);
        self
    }

    pub fn with_routing_probability(mut self, probability: f64) -> Self {
        self.routing_probability = Some(probability);
        self
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn error_mode(&self) -> Option<ErrorModeId> {
        self.error_mode
    }

    /// Routing probability of the propagation port this gate was reached through.
    pub fn routing_probability(&self) -> Option<f64> {
        self.routing_probability
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Basic(BasicEvent),
    Gate(Gate),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Basic(event) => event.name(),
            Node::Gate(gate) => gate.name(),
        }
    }

    pub fn is_basic_event(&self) -> bool {
        matches!(self, Node::Basic(_))
    }

    /// Children of a gate; empty for a basic event.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Basic(_) => &[],
            Node::Gate(gate) => &gate.children,
        }
    }
}

/// Arena of fault-tree nodes with a designated root (the top event).
///
/// `Clone` copies the arena, so the copy keeps the sharing structure of the
/// original and can be reduced independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultTree {
    nodes: Vec<Node>,
    root: NodeId,
}

// Construction
impl FaultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_basic_event(&mut self, fault_id: FaultModeId, fault: InternalFaultMode) -> NodeId {
        self.push(Node::Basic(BasicEvent::new(fault_id, fault)))
    }

    pub fn add_gate(&mut self, gate: Gate) -> NodeId {
        self.push(Node::Gate(gate))
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

// Access
impl FaultTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including nodes no longer reachable
    /// after a reduction.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).name()
    }

    pub fn basic_event(&self, id: NodeId) -> Option<&BasicEvent> {
        match self.node(id) {
            Node::Basic(event) => Some(event),
            Node::Gate(_) => None,
        }
    }

    pub fn gate(&self, id: NodeId) -> Option<&Gate> {
        match self.node(id) {
            Node::Gate(gate) => Some(gate),
            Node::Basic(_) => None,
        }
    }
}

// Traversal
impl FaultTree {
    /// Nodes reachable from the root, breadth-first, each listed once.
    pub fn reachable(&self) -> Vec<NodeId> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        seen[self.root.index()] = true;
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &child in self.children(id) {
                if !std::mem::replace(&mut seen[child.index()], true) {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Reachable basic events in breadth-first order.
    pub fn basic_events(&self) -> Vec<NodeId> {
        self.reachable()
            .into_iter()
            .filter(|&id| self.node(id).is_basic_event())
            .collect()
    }

    /// First reachable node (breadth-first) whose name is `name`.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.reachable().into_iter().find(|&id| self.name(id) == name)
    }

    /// Reachable basic event wrapping the fault mode called `name`.
    pub fn find_basic_event(&self, name: &str) -> Option<NodeId> {
        self.basic_events().into_iter().find(|&id| self.name(id) == name)
    }

    pub fn gate_count(&self) -> usize {
        self.reachable()
            .into_iter()
            .filter(|&id| !self.node(id).is_basic_event())
            .count()
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut memo = vec![0usize; self.nodes.len()];
        self.depth_of(self.root, &mut memo)
    }

    fn depth_of(&self, id: NodeId, memo: &mut [usize]) -> usize {
        if memo[id.index()] == 0 {
            let below = self
                .children(id)
                .iter()
                .map(|&child| self.depth_of(child, memo))
                .max()
                .unwrap_or(0);
            memo[id.index()] = below + 1;
        }
        memo[id.index()]
    }

    /// Whether the top event occurs when exactly the basic events accepted
    /// by `occurred` have occurred.
    pub fn evaluate<F>(&self, occurred: &F) -> bool
    where
        F: Fn(NodeId) -> bool,
    {
        !self.is_empty() && self.evaluate_node(self.root, occurred)
    }

    fn evaluate_node<F>(&self, id: NodeId, occurred: &F) -> bool
    where
        F: Fn(NodeId) -> bool,
    {
        match self.node(id) {
            Node::Basic(_) => occurred(id),
            Node::Gate(gate) => {
                let mut active = gate.children.iter().map(|&child| self.evaluate_node(child, occurred));
                match gate.kind {
                    GateKind::And => active.all(|fired| fired),
                    GateKind::Or => active.any(|fired| fired),
                    GateKind::KofN(k) => active.filter(|&fired| fired).count() >= k as usize,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_log::test;

    use super::*;

    /// OR(AND(A, B), KofN(2; A, C, D)) with A shared.
    fn sample() -> FaultTree {
        let mut tree = FaultTree::new();
        let [a, b, c, d] = ["A", "B", "C", "D"].map(|name| {
            let id = FaultModeId::new(name.as_bytes()[0] as u32);
            tree.add_basic_event(id, InternalFaultMode::new(name, "exp(1)"))
        });
        let and = tree.add_gate(Gate::new(GateKind::And, "G1", vec![a, b]));
        let vote = tree.add_gate(Gate::new(GateKind::KofN(2), "G2", vec![a, c, d]));
        let top = tree.add_gate(Gate::new(GateKind::Or, "Top", vec![and, vote]).with_error_mode(ErrorModeId::new(0)));
        tree.set_root(top);
        tree
    }

    fn names(tree: &FaultTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.name(id).to_string()).collect()
    }

    #[test]
    fn test_basic_events_are_shared() {
        let tree = sample();
        assert_eq!(names(&tree, &tree.basic_events()), ["A", "B", "C", "D"]);
        assert_eq!(tree.gate_count(), 3);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_find_by_name() {
        let tree = sample();
        let g2 = tree.find_by_name("G2").unwrap();
        assert_eq!(tree.gate(g2).unwrap().kind(), GateKind::KofN(2));
        assert!(tree.find_basic_event("C").is_some());
        assert!(tree.find_basic_event("G2").is_none());
        assert!(tree.find_by_name("Z").is_none());
        assert_eq!(tree.gate(tree.root()).unwrap().error_mode(), Some(ErrorModeId::new(0)));
    }

    #[test]
    fn test_evaluate() {
        let tree = sample();
        let by_name = |set: &[&str]| -> HashSet<NodeId> {
            set.iter().map(|n| tree.find_basic_event(n).unwrap()).collect()
        };

        for (occurred, expected) in [
            (vec![], false),
            (vec!["A"], false),
            (vec!["A", "B"], true),
            (vec!["A", "C"], true),
            (vec!["C", "D"], true),
            (vec!["B", "C"], false),
        ] {
            let set = by_name(&occurred);
            assert_eq!(tree.evaluate(&|id| set.contains(&id)), expected, "{:?}", occurred);
        }
    }

    #[test]
    fn test_clone_preserves_sharing() {
        let tree = sample();
        let mut copy = tree.clone();
        assert_eq!(copy, tree);

        let a = copy.find_basic_event("A").unwrap();
        if let Node::Basic(event) = copy.node_mut(a) {
            event.replace_fault(InternalFaultMode::occurred("A"));
        }
        // Both parents of A see the change in the copy, the original is untouched.
        let g1 = copy.find_by_name("G1").unwrap();
        let g2 = copy.find_by_name("G2").unwrap();
        assert!(copy.children(g1).contains(&a));
        assert!(copy.children(g2).contains(&a));
        assert_eq!(copy.basic_event(a).unwrap().fault().distribution.as_deref(), Some("dirac(0)"));
        let original = tree.find_basic_event("A").unwrap();
        assert_eq!(tree.basic_event(original).unwrap().fault().distribution.as_deref(), Some("exp(1)"));
    }

    #[test]
    fn test_empty_tree() {
        let tree = FaultTree::new();
        assert!(tree.basic_events().is_empty());
        assert_eq!(tree.depth(), 0);
        assert!(!tree.evaluate(&|_| true));
    }
}
