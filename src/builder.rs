//! Fault-tree construction by unrolling propagation chains.
//!
//! Starting from an error mode, the builder walks its parsed activation
//! function. Internal fault modes become basic events. An external fault mode
//! is followed through the propagation ports that produce it to the upstream
//! failure mode, then to the error mode that emits that failure, whose own
//! activation function is unrolled in place of the leaf. The result is a DAG:
//! each fault mode is one basic event, and each upstream error mode reached
//! through the same port is unrolled once.
//!
//! ```
//! use faultflow::builder::FaultTreeBuilder;
//! use faultflow::model::System;
//!
//! # fn main() -> faultflow::error::Result<()> {
//! let mut system = System::new("chain");
//! let up = system.add_component("Upstream")?;
//! let down = system.add_component("Downstream")?;
//! let up_fail = system.add_failure_mode("UpFail")?;
//! let down_fail = system.add_failure_mode("DownFail")?;
//! system.add_error_mode(up, "UpErr", "A && B", up_fail, None)?;
//! let top = system.add_error_mode(down, "DownErr", "C || FromUp", down_fail, None)?;
//! let from_up = system.faults().require("FromUp")?;
//! system.add_propagation_port(up, up_fail, from_up, down, 1.0)?;
//!
//! let tree = FaultTreeBuilder::new(&system).build(top)?;
//! assert_eq!(tree.basic_events().len(), 3);
//! assert_eq!(tree.name(tree.root()), "DownErr");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::fault::FaultKind;
use crate::model::System;
use crate::reduce::TreeCutter;
use crate::tree::{FaultTree, Gate, GateKind};
use crate::types::{ErrorModeId, FaultModeId, NodeId, PortId};

/// How gates that do not stand for an error mode are named.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateNaming {
    /// The simple-infix text of the sub-expression, e.g. `(A)&&(B)`.
    Expression,
    /// `G1`, `G2`, ... in creation order.
    Numbered,
}

/// Configuration options for fault-tree construction.
///
/// Use `BuilderConfig::default()` for standard settings.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Wrap an error mode whose activation function is a single leaf in a
    /// one-child OR gate, so the error mode and its routing probability stay
    /// attached to the tree (default: true).
    pub wrap_single_leaf: bool,
    /// Naming of inner gates (default: `Expression`).
    pub gate_naming: GateNaming,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            wrap_single_leaf: true,
            gate_naming: GateNaming::Expression,
        }
    }
}

pub struct FaultTreeBuilder<'a> {
    system: &'a System,
    config: BuilderConfig,
}

impl<'a> FaultTreeBuilder<'a> {
    pub fn new(system: &'a System) -> Self {
        Self::with_config(system, BuilderConfig::default())
    }

    pub fn with_config(system: &'a System, config: BuilderConfig) -> Self {
        Self { system, config }
    }

    /// Builds the fault tree whose top event is `error_mode`.
    ///
    /// Every call produces a fresh tree.
    pub fn build(&self, error_mode: ErrorModeId) -> Result<FaultTree> {
        let mut state = BuildState::default();
        let root = self.unroll(&mut state, error_mode, None)?;
        state.tree.set_root(root);
        debug!(
            "built fault tree for `{}`: {} nodes, {} basic events",
            self.system.error_mode(error_mode).name(),
            state.tree.len(),
            state.basic.len()
        );
        Ok(state.tree)
    }

    /// Builds the fault tree for the error mode called `name`.
    pub fn build_by_name(&self, name: &str) -> Result<FaultTree> {
        self.build(self.system.error_mode_by_name(name)?)
    }

    fn unroll(&self, state: &mut BuildState, id: ErrorModeId, port: Option<PortId>) -> Result<NodeId> {
        if let Some(&node) = state.unrolled.get(&(id, port)) {
            return Ok(node);
        }
        let error_mode = self.system.error_mode(id);
        if state.in_progress.contains(&id) {
            return Err(Error::RepeatedEvent {
                error_mode: error_mode.name().to_string(),
            });
        }

        debug!("unrolling error mode `{}` (depth {})", error_mode.name(), state.in_progress.len());
        state.in_progress.push(id);
        let boundary = Boundary {
            error_mode: id,
            routing_probability: port.map(|p| self.system.port(p).routing_probability()),
        };
        let node = self.materialize(state, error_mode.activation(), Some(boundary));
        state.in_progress.pop();

        let node = node?;
        state.unrolled.insert((id, port), node);
        Ok(node)
    }

    fn materialize(&self, state: &mut BuildState, expr: &Expr, boundary: Option<Boundary>) -> Result<NodeId> {
        let kind = match expr {
            Expr::Leaf(fault) => {
                let node = self.leaf(state, *fault)?;
                return match boundary {
                    Some(boundary) if self.config.wrap_single_leaf => {
                        let gate = self.boundary_gate(Gate::new(GateKind::Or, "", vec![node]), boundary);
                        Ok(state.tree.add_gate(gate))
                    }
                    _ => Ok(node),
                };
            }
            Expr::Not(_) => {
                return Err(Error::NonCoherentGate {
                    expression: expr.to_simple_string(self.system.faults()),
                });
            }
            Expr::And(_) => GateKind::And,
            Expr::Or(_) => GateKind::Or,
            Expr::KofN { k, .. } => GateKind::KofN(*k),
        };

        let children = expr
            .children()
            .iter()
            .map(|child| self.materialize(state, child, None))
            .collect::<Result<Vec<_>>>()?;

        let gate = match boundary {
            Some(boundary) => self.boundary_gate(Gate::new(kind, "", children), boundary),
            None => {
                let name = match self.config.gate_naming {
                    GateNaming::Expression => expr.to_simple_string(self.system.faults()),
                    GateNaming::Numbered => {
                        state.numbered += 1;
                        format!("G{}", state.numbered)
                    }
                };
                Gate::new(kind, name, children)
            }
        };
        Ok(state.tree.add_gate(gate))
    }

    /// Renames a gate after the error mode it stands for and tags it.
    fn boundary_gate(&self, gate: Gate, boundary: Boundary) -> Gate {
        let name = self.system.error_mode(boundary.error_mode).name();
        let gate = Gate::new(gate.kind(), name, gate.children().to_vec()).with_error_mode(boundary.error_mode);
        match boundary.routing_probability {
            Some(p) => gate.with_routing_probability(p),
            None => gate,
        }
    }

    fn leaf(&self, state: &mut BuildState, fault: FaultModeId) -> Result<NodeId> {
        if let Some(&node) = state.basic.get(&fault) {
            return Ok(node);
        }
        if let Some(&node) = state.external.get(&fault) {
            return Ok(node);
        }

        let fault_mode = self.system.faults().get(fault);
        match fault_mode.kind() {
            FaultKind::Internal { .. } => {
                let internal = fault_mode
                    .as_internal()
                    .ok_or_else(|| Error::UnknownFaultMode(fault_mode.name().to_string()))?;
                trace!("basic event `{}`", internal.name);
                let node = state.tree.add_basic_event(fault, internal);
                state.basic.insert(fault, node);
                Ok(node)
            }
            FaultKind::External => {
                let unresolved = || Error::UnresolvedPropagation {
                    fault_mode: fault_mode.name().to_string(),
                };

                let mut branches = Vec::new();
                for port in self.system.ports_feeding(fault) {
                    let mut producers = self.system.producers_of(port.propagated_failure()).peekable();
                    if producers.peek().is_none() {
                        return Err(unresolved());
                    }
                    for producer in producers {
                        branches.push(self.unroll(state, producer.id(), Some(port.id()))?);
                    }
                }

                let node = match branches.len() {
                    0 => return Err(unresolved()),
                    1 => branches[0],
                    n => {
                        trace!("external fault `{}` fed by {} branches", fault_mode.name(), n);
                        state.tree.add_gate(Gate::new(GateKind::Or, fault_mode.name(), branches))
                    }
                };
                state.external.insert(fault, node);
                Ok(node)
            }
        }
    }
}

impl System {
    /// Builds the fault tree of `error_mode` with the default configuration.
    pub fn fault_tree(&self, error_mode: ErrorModeId) -> Result<FaultTree> {
        FaultTreeBuilder::new(self).build(error_mode)
    }

    pub fn fault_tree_with_config(&self, error_mode: ErrorModeId, config: &BuilderConfig) -> Result<FaultTree> {
        FaultTreeBuilder::with_config(self, config.clone()).build(error_mode)
    }
}

/// Prunes `tree` in place down to the basic events named in `retained`;
/// returns whether the top event can still occur.
pub fn reduce_tree<S: AsRef<str>>(retained: &[S], tree: &mut FaultTree) -> bool {
    TreeCutter::new(retained.iter().map(|s| s.as_ref())).reduce(tree)
}

#[derive(Debug, Copy, Clone)]
struct Boundary {
    error_mode: ErrorModeId,
    routing_probability: Option<f64>,
}

#[derive(Default)]
struct BuildState {
    tree: FaultTree,
    basic: HashMap<FaultModeId, NodeId>,
    external: HashMap<FaultModeId, NodeId>,
    unrolled: HashMap<(ErrorModeId, Option<PortId>), NodeId>,
    in_progress: Vec<ErrorModeId>,
    numbered: usize,
}
