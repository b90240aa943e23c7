//! Component/error-mode/propagation model of a system.
//!
//! A [`System`] owns every entity in arenas addressed by the ids from
//! [`types`][crate::types], together with the [`FaultRegistry`] that resolves
//! fault-mode names in activation functions. The model is read-only input to
//! the analyses: fault-tree construction, Petri-net translation and
//! importance measures never modify it.
//!
//! ```
//! use faultflow::model::System;
//!
//! # fn main() -> faultflow::error::Result<()> {
//! let mut system = System::new("tank");
//! let pump = system.add_component("Pump")?;
//! let tank = system.add_component("Tank")?;
//! system.add_internal_fault("PumpWear", Some("exp(0.001)"))?;
//! let no_flow = system.add_failure_mode("NoFlow")?;
//! system.add_error_mode(pump, "PumpError", "PumpWear", no_flow, Some("dirac(1)"))?;
//!
//! let dry = system.add_external_fault("DryRun")?;
//! system.add_propagation_port(pump, no_flow, dry, tank, 1.0)?;
//! assert_eq!(system.ports_feeding(dry).count(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::fault::FaultRegistry;
use crate::types::{ComponentId, ErrorModeId, FailureModeId, FaultModeId, PortId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMode {
    id: FailureModeId,
    description: String,
}

impl FailureMode {
    pub fn id(&self) -> FailureModeId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A component state reached when its activation function holds; once
/// reached, it produces the outgoing failure mode after `delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMode {
    id: ErrorModeId,
    name: String,
    component: ComponentId,
    activation: Expr,
    outgoing: FailureModeId,
    delay: Option<String>,
}

impl ErrorMode {
    pub fn id(&self) -> ErrorModeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn activation(&self) -> &Expr {
        &self.activation
    }

    pub fn outgoing_failure(&self) -> FailureModeId {
        self.outgoing
    }

    /// Fault-to-failure delay distribution descriptor.
    pub fn delay(&self) -> Option<&str> {
        self.delay.as_deref()
    }

    pub fn input_fault_modes(&self) -> Vec<FaultModeId> {
        self.activation.input_fault_modes()
    }
}

/// Carries a failure of the owning component to an external fault mode of
/// the affected component.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationPort {
    id: PortId,
    component: ComponentId,
    propagated_failure: FailureModeId,
    external_fault: FaultModeId,
    affected_component: ComponentId,
    routing_probability: f64,
}

impl PropagationPort {
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Component whose failure propagates through this port.
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn propagated_failure(&self) -> FailureModeId {
        self.propagated_failure
    }

    pub fn external_fault(&self) -> FaultModeId {
        self.external_fault
    }

    pub fn affected_component(&self) -> ComponentId {
        self.affected_component
    }

    /// Probability in `(0, 1]` that the failure reaches the external fault.
    pub fn routing_probability(&self) -> f64 {
        self.routing_probability
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    id: ComponentId,
    name: String,
    error_modes: Vec<ErrorModeId>,
    ports: Vec<PortId>,
    children: Vec<ComponentId>,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_modes(&self) -> &[ErrorModeId] {
        &self.error_modes
    }

    pub fn propagation_ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Direct composition children.
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
pub struct System {
    name: String,
    faults: FaultRegistry,
    components: Vec<Component>,
    failure_modes: Vec<FailureMode>,
    error_modes: Vec<ErrorMode>,
    ports: Vec<PropagationPort>,
    top_level: Option<ComponentId>,

    component_by_name: HashMap<String, ComponentId>,
    failure_by_name: HashMap<String, FailureModeId>,
    error_by_name: HashMap<String, ErrorModeId>,
}

// Construction
impl System {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_component(&mut self, name: &str) -> Result<ComponentId> {
        if self.component_by_name.contains_key(name) {
            return Err(Error::DuplicateName {
                kind: "component",
                name: name.to_string(),
            });
        }
        let id = ComponentId::from_index(self.components.len());
        self.components.push(Component {
            id,
            name: name.to_string(),
            error_modes: Vec::new(),
            ports: Vec::new(),
            children: Vec::new(),
        });
        self.component_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declares an internal fault mode with an optional time-to-fault distribution.
    pub fn add_internal_fault(&mut self, name: &str, distribution: Option<&str>) -> Result<FaultModeId> {
        self.faults.declare_internal(name, distribution)
    }

    pub fn add_external_fault(&mut self, name: &str) -> Result<FaultModeId> {
        self.faults.declare_external(name)
    }

    pub fn add_failure_mode(&mut self, description: &str) -> Result<FailureModeId> {
        if self.failure_by_name.contains_key(description) {
            return Err(Error::DuplicateName {
                kind: "failure mode",
                name: description.to_string(),
            });
        }
        let id = FailureModeId::from_index(self.failure_modes.len());
        self.failure_modes.push(FailureMode {
            id,
            description: description.to_string(),
        });
        self.failure_by_name.insert(description.to_string(), id);
        Ok(id)
    }

    /// Adds an error mode to `component`, parsing `activation` against the
    /// system's fault registry. Unknown leaves become internal fault modes.
    pub fn add_error_mode(
        &mut self,
        component: ComponentId,
        name: &str,
        activation: &str,
        outgoing: FailureModeId,
        delay: Option<&str>,
    ) -> Result<ErrorModeId> {
        if self.error_by_name.contains_key(name) {
            return Err(Error::DuplicateName {
                kind: "error mode",
                name: name.to_string(),
            });
        }
        self.check_component(component)?;
        self.check_failure_mode(outgoing)?;
        // Names registered by a failed parse are rolled back.
        let registered = self.faults.len();
        let activation = match Expr::parse(activation, &mut self.faults) {
            Ok(activation) => activation,
            Err(e) => {
                self.faults.truncate(registered);
                return Err(e);
            }
        };

        let id = ErrorModeId::from_index(self.error_modes.len());
        self.error_modes.push(ErrorMode {
            id,
            name: name.to_string(),
            component,
            activation,
            outgoing,
            delay: delay.map(str::to_string),
        });
        self.components[component.index()].error_modes.push(id);
        self.error_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Adds a propagation port to `component`. A fault mode that parsing
    /// registered implicitly is converted to an external one.
    pub fn add_propagation_port(
        &mut self,
        component: ComponentId,
        propagated_failure: FailureModeId,
        external_fault: FaultModeId,
        affected_component: ComponentId,
        routing_probability: f64,
    ) -> Result<PortId> {
        if !(routing_probability > 0.0 && routing_probability <= 1.0) {
            return Err(Error::InvalidRoutingProbability {
                value: routing_probability,
            });
        }
        self.check_component(component)?;
        self.check_component(affected_component)?;
        self.check_failure_mode(propagated_failure)?;
        if external_fault.index() >= self.faults.len() {
            return Err(Error::UnknownFaultMode(external_fault.to_string()));
        }
        let name = self.faults.name(external_fault).to_string();
        self.faults.declare_external(&name)?;

        let id = PortId::from_index(self.ports.len());
        self.ports.push(PropagationPort {
            id,
            component,
            propagated_failure,
            external_fault,
            affected_component,
            routing_probability,
        });
        self.components[component.index()].ports.push(id);
        Ok(id)
    }

    /// Composes `child` into `parent`, rejecting edges that would make the
    /// hierarchy cyclic.
    pub fn add_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.check_component(parent)?;
        self.check_component(child)?;
        if self.is_descendant(parent, child) {
            return Err(Error::CompositionCycle {
                parent: self.components[parent.index()].name.clone(),
                child: self.components[child.index()].name.clone(),
            });
        }
        let children = &mut self.components[parent.index()].children;
        if !children.contains(&child) {
            children.push(child);
        }
        Ok(())
    }

    pub fn set_top_level(&mut self, component: ComponentId) -> Result<()> {
        self.check_component(component)?;
        self.top_level = Some(component);
        Ok(())
    }

    /// Whether `node` is `root` or lies below it in the composition hierarchy.
    fn is_descendant(&self, node: ComponentId, root: ComponentId) -> bool {
        let mut stack = vec![root];
        let mut seen = vec![false; self.components.len()];
        while let Some(current) = stack.pop() {
            if current == node {
                return true;
            }
            if std::mem::replace(&mut seen[current.index()], true) {
                continue;
            }
            stack.extend(self.components[current.index()].children.iter().copied());
        }
        false
    }

    fn check_component(&self, id: ComponentId) -> Result<()> {
        if id.index() < self.components.len() {
            Ok(())
        } else {
            Err(Error::UnknownComponent(id.to_string()))
        }
    }

    fn check_failure_mode(&self, id: FailureModeId) -> Result<()> {
        if id.index() < self.failure_modes.len() {
            Ok(())
        } else {
            Err(Error::UnknownFailureMode(id.to_string()))
        }
    }
}

// Queries
impl System {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faults(&self) -> &FaultRegistry {
        &self.faults
    }

    pub fn top_level(&self) -> Option<ComponentId> {
        self.top_level
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.index()]
    }

    pub fn failure_mode(&self, id: FailureModeId) -> &FailureMode {
        &self.failure_modes[id.index()]
    }

    pub fn error_mode(&self, id: ErrorModeId) -> &ErrorMode {
        &self.error_modes[id.index()]
    }

    pub fn port(&self, id: PortId) -> &PropagationPort {
        &self.ports[id.index()]
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn failure_modes(&self) -> impl Iterator<Item = &FailureMode> {
        self.failure_modes.iter()
    }

    pub fn error_modes(&self) -> impl Iterator<Item = &ErrorMode> {
        self.error_modes.iter()
    }

    pub fn ports(&self) -> impl Iterator<Item = &PropagationPort> {
        self.ports.iter()
    }

    pub fn component_by_name(&self, name: &str) -> Result<ComponentId> {
        self.component_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownComponent(name.to_string()))
    }

    pub fn failure_mode_by_name(&self, description: &str) -> Result<FailureModeId> {
        self.failure_by_name
            .get(description)
            .copied()
            .ok_or_else(|| Error::UnknownFailureMode(description.to_string()))
    }

    pub fn error_mode_by_name(&self, name: &str) -> Result<ErrorModeId> {
        self.error_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownErrorMode(name.to_string()))
    }

    /// Ports whose external fault mode is `fault`.
    pub fn ports_feeding(&self, fault: FaultModeId) -> impl Iterator<Item = &PropagationPort> {
        self.ports.iter().filter(move |port| port.external_fault == fault)
    }

    /// Error modes whose outgoing failure is `failure`.
    pub fn producers_of(&self, failure: FailureModeId) -> impl Iterator<Item = &ErrorMode> {
        self.error_modes.iter().filter(move |em| em.outgoing == failure)
    }
}
