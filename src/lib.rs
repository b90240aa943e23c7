//! # faultflow: fault propagation analysis in Rust
//!
//! **`faultflow`** models how faults inside components propagate, through error modes and
//! propagation ports, into failures of the whole system. From one model it derives
//! fault trees, their minimal cut sets, and a stochastic Petri-net encoding of the same
//! propagation semantics.
//!
//! ## Modelling
//!
//! A [`System`][crate::model::System] owns components. Each component has **error modes**:
//! a boolean activation function over fault modes (e.g. `"Wear || (Leak && Heat)"`) that,
//! when satisfied, produces an outgoing **failure mode**. A **propagation port** turns a
//! failure of one component into an **external fault mode** of another, with a routing
//! probability. Internal fault modes are the leaves of the analysis.
//!
//! Activation functions use `&&`, `||`, `!`, and `k/n(a,b,...)` for K-out-of-N voting.
//!
//! ## Quick Start
//!
//! ```rust
//! use faultflow::model::System;
//!
//! # fn main() -> faultflow::error::Result<()> {
//! let mut system = System::new("tank");
//! let pump = system.add_component("Pump")?;
//! let tank = system.add_component("Tank")?;
//!
//! // 1. Failures and error modes
//! let no_flow = system.add_failure_mode("NoFlow")?;
//! let overflow = system.add_failure_mode("Overflow")?;
//! system.add_error_mode(pump, "PumpError", "Wear || Clog", no_flow, None)?;
//! let top = system.add_error_mode(tank, "TankError", "NoFlowIn && SensorFault", overflow, None)?;
//!
//! // 2. Propagation from the pump into the tank
//! let no_flow_in = system.faults().require("NoFlowIn")?;
//! system.add_propagation_port(pump, no_flow, no_flow_in, tank, 1.0)?;
//!
//! // 3. Fault tree and minimal cut sets of the tank error mode
//! let tree = system.fault_tree(top)?;
//! let cut_sets = tree.minimal_cut_sets()?;
//! let mut names: Vec<_> = cut_sets.iter().map(|cs| cs.names(&tree)).collect();
//! names.sort();
//! assert_eq!(names, [["Clog", "SensorFault"], ["SensorFault", "Wear"]]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Components
//!
//! - **[`expr`]** and **[`entities`]**: activation functions, their serialized forms, and the
//!   bottom-up entity decomposition of a bracketed expression.
//! - **[`builder`]**: unrolls an error mode into a [`FaultTree`][crate::tree::FaultTree].
//! - **[`mocus`]**: minimal cut sets by top-down substitution.
//! - **[`reduce`]**: restricting a tree to a set of events, and substituting fault modes.
//! - **[`petri`]**: structural Petri-net translation and scenario decoration.
//! - **[`importance`]**: Fussell-Vesely and Birnbaum measures on top of an external solver.
//!
//! Probabilities are never computed here; distributions are carried as opaque descriptors
//! such as `exp(0.001)` or `dirac(3)`.

pub mod builder;
pub mod cutset;
pub mod entities;
pub mod error;
pub mod expr;
pub mod fault;
pub mod importance;
pub mod model;
pub mod mocus;
pub mod petri;
pub mod reduce;
pub mod tree;
pub mod types;
pub mod utils;
