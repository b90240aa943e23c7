//! Translation of a [`System`] into a stochastic Petri net.

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::model::{ErrorMode, PropagationPort, System};
use crate::petri::net::{Delay, Marking, PetriNet};
use crate::petri::scenario::{DecorationMode, Event};
use crate::types::{ErrorModeId, FailureModeId, FaultModeId};
use crate::utils::format_probability;

/// Draws one concrete delay from a distribution descriptor.
///
/// Used in fault-injection mode, where each internal fault fires at a single
/// sampled instant instead of following its distribution.
pub trait DelaySampler {
    fn sample(&mut self, distribution: &str) -> Result<f64>;
}

impl<F> DelaySampler for F
where
    F: FnMut(&str) -> Result<f64>,
{
    fn sample(&mut self, distribution: &str) -> Result<f64> {
        self(distribution)
    }
}

/// Naming and timing knobs of the translation.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Appended to a fault or failure name to form its occurrence place.
    pub occurrence_suffix: String,
    /// Prepended to `<failure><external fault>` to form the router place of a port.
    pub router_prefix: String,
    /// Appended to a failure name to form its propagation transition.
    pub propagation_suffix: String,
    /// Deterministic delay of an internal fault without a distribution.
    pub default_fault_delay: f64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            occurrence_suffix: "Occurrence".to_string(),
            router_prefix: "Router".to_string(),
            propagation_suffix: "toFaults".to_string(),
            default_fault_delay: 1.0,
        }
    }
}

/// Name of the transition leaving `place`: the place name with its first
/// letter lower-cased.
pub fn transition_name(place: &str) -> String {
    let mut chars = place.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds the Petri net of a system and decorates it with scenario events.
///
/// - Each error mode is a marked place with a transition into its outgoing
///   failure place, guarded by the activation function.
/// - Each internal fault read by an activation function gets a marked
///   occurrence place and a transition into the fault place.
/// - Each propagation port moves a token from the failure place into the
///   external fault place, through a weighted router when the routing
///   probability is below one.
///
/// ```
/// use faultflow::model::System;
/// use faultflow::petri::PetriNetTranslator;
///
/// # fn main() -> faultflow::error::Result<()> {
/// let mut system = System::new("s");
/// let c = system.add_component("C")?;
/// let fail = system.add_failure_mode("CFail")?;
/// system.add_internal_fault("Wear", Some("exp(0.1)"))?;
/// system.add_error_mode(c, "CError", "Wear", fail, None)?;
///
/// let mut translator = PetriNetTranslator::new();
/// translator.translate(&system)?;
/// assert!(translator.net().has_place("WearOccurrence"));
/// assert_eq!(translator.marking().tokens("CError"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PetriNetTranslator {
    config: TranslatorConfig,
    net: PetriNet,
    marking: Marking,
    name: String,
    error_transitions: HashMap<ErrorModeId, String>,
    next_priority: u32,
}

impl PetriNetTranslator {
    pub fn new() -> Self {
        Self::with_config(TranslatorConfig::default())
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        Self {
            config,
            net: PetriNet::new(),
            marking: Marking::new(),
            name: String::new(),
            error_transitions: HashMap::new(),
            next_priority: 1,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn net(&self) -> &PetriNet {
        &self.net
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    /// Name of the last translated system.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the transition carrying the activation of `error_mode`.
    pub fn error_transition(&self, error_mode: ErrorModeId) -> Option<&str> {
        self.error_transitions.get(&error_mode).map(String::as_str)
    }

    pub fn into_parts(self) -> (PetriNet, Marking) {
        (self.net, self.marking)
    }
}

impl Default for PetriNetTranslator {
    fn default() -> Self {
        Self::new()
    }
}

// Translation
impl PetriNetTranslator {
    /// Translates `system` for fault analysis: internal faults fire after
    /// their own distributions.
    pub fn translate(&mut self, system: &System) -> Result<()> {
        self.translate_impl(system, None)
    }

    /// Translates `system` for fault injection: each internal fault with a
    /// distribution fires at one instant drawn from `sampler`.
    pub fn translate_with_sampler(&mut self, system: &System, sampler: &mut dyn DelaySampler) -> Result<()> {
        self.translate_impl(system, Some(sampler))
    }

    fn translate_impl(&mut self, system: &System, mut sampler: Option<&mut (dyn DelaySampler + '_)>) -> Result<()> {
        debug!("translating system `{}`", system.name());
        self.name = system.name().to_string();

        for component in system.components() {
            for &em in component.error_modes() {
                let error_mode = system.error_mode(em);
                self.add_error_mode(system, error_mode);
                for fault in error_mode.input_fault_modes() {
                    self.add_input_fault(system, fault, sampler.as_deref_mut())?;
                }
            }
            for &port in component.propagation_ports() {
                self.add_port(system, system.port(port));
            }
        }

        debug!(
            "net of `{}` has {} places and {} transitions",
            self.name,
            self.net.places().count(),
            self.net.transitions().count()
        );
        Ok(())
    }

    fn add_error_mode(&mut self, system: &System, error_mode: &ErrorMode) {
        let failure = system.failure_mode(error_mode.outgoing_failure()).description();
        let transition = error_transition_name(system, error_mode);
        trace!("error mode `{}` -> `{}` via `{}`", error_mode.name(), failure, transition);

        self.net.add_place(error_mode.name());
        self.net.add_place(failure);
        let t = self.net.add_transition(&transition);
        t.set_enabling_function(error_mode.activation().to_enabling_string(system.faults()));
        if let Some(delay) = error_mode.delay() {
            t.set_delay(Delay::distribution(delay));
        }
        self.net.add_precondition(error_mode.name(), &transition);
        self.net.add_postcondition(&transition, failure);
        self.marking.set_tokens(error_mode.name(), 1);
        self.error_transitions.insert(error_mode.id(), transition);
    }

    fn add_input_fault(
        &mut self,
        system: &System,
        fault: FaultModeId,
        sampler: Option<&mut (dyn DelaySampler + '_)>,
    ) -> Result<()> {
        let fault = system.faults().get(fault);
        if self.net.has_place(fault.name()) {
            return Ok(());
        }
        self.net.add_place(fault.name());
        if fault.is_external() {
            return Ok(());
        }

        let delay = match (fault.distribution(), sampler) {
            (Some(distribution), Some(sampler)) => {
                let value = sampler.sample(distribution)?;
                trace!("sampled {} from `{}` for `{}`", value, distribution, fault.name());
                Delay::deterministic(value)
            }
            (Some(distribution), None) => Delay::distribution(distribution),
            (None, _) => Delay::deterministic(self.config.default_fault_delay),
        };

        let occurrence = format!("{}{}", fault.name(), self.config.occurrence_suffix);
        let transition = transition_name(&occurrence);
        self.net.add_place(&occurrence);
        self.marking.set_tokens(&occurrence, 1);
        self.net.add_transition(&transition).set_delay(delay).set_priority(0);
        self.net.add_precondition(&occurrence, &transition);
        self.net.add_postcondition(&transition, fault.name());
        Ok(())
    }

    fn add_port(&mut self, system: &System, port: &PropagationPort) {
        let failure = system.failure_mode(port.propagated_failure()).description();
        let external = system.faults().name(port.external_fault());

        if !self.net.has_place(failure) {
            warn!("failure `{}` is propagated but produced by no error mode", failure);
            self.net.add_place(failure);
        }
        self.net.add_place(external);

        let transition = format!("{}{}", failure, self.config.propagation_suffix);
        if self.net.transition(&transition).is_none() {
            self.net
                .add_transition(&transition)
                .set_delay(Delay::deterministic(0.0))
                .set_priority(0);
            self.net.add_precondition(failure, &transition);
        }

        let p = port.routing_probability();
        if p >= 1.0 {
            self.net.add_postcondition(&transition, external);
            return;
        }

        // One router per port, so ports sharing an external fault keep their own weights.
        let router = format!("{}{}{}", self.config.router_prefix, failure, external);
        self.net.add_place(&router);
        self.net.add_postcondition(&transition, &router);

        let priority = self.next_priority;
        self.next_priority += 1;
        let propagated = format!("{}Propagated", transition_name(&router));
        let blocked = format!("{}Blocked", transition_name(&router));
        self.net
            .add_transition(&propagated)
            .set_delay(Delay::weighted(0.0, format_probability(p)))
            .set_priority(priority);
        self.net
            .add_transition(&blocked)
            .set_delay(Delay::weighted(0.0, format_probability(1.0 - p)))
            .set_priority(priority);
        self.net.add_precondition(&router, &propagated);
        self.net.add_precondition(&router, &blocked);
        self.net.add_postcondition(&propagated, external);
        trace!("router `{}` forwards with probability {}", router, p);
    }
}

/// Transition name of an error mode: named after its failure, unless several
/// error modes produce that failure.
fn error_transition_name(system: &System, error_mode: &ErrorMode) -> String {
    let failure = system.failure_mode(error_mode.outgoing_failure()).description();
    if system.producers_of(error_mode.outgoing_failure()).count() > 1 {
        format!("{}To{}", transition_name(error_mode.name()), failure)
    } else {
        transition_name(failure)
    }
}

// Decoration
impl PetriNetTranslator {
    /// Applies one operational event, occurring at `timestamp`, to the
    /// translated net.
    pub fn decorate(&mut self, system: &System, event: Event, timestamp: f64, mode: DecorationMode) -> Result<()> {
        debug!("decorating with {:?} at {} ({:?})", event, timestamp, mode);
        match event {
            Event::Fault(fault) => self.decorate_fault(system, fault, timestamp, mode),
            Event::Failure(failure) => self.decorate_failure(system, failure, timestamp, mode),
            Event::Error(error_mode) => self.decorate_error(system, error_mode, timestamp),
        }
    }

    fn decorate_fault(&mut self, system: &System, fault: FaultModeId, timestamp: f64, mode: DecorationMode) -> Result<()> {
        if fault.index() >= system.faults().len() {
            return Err(Error::UnknownFaultMode(fault.to_string()));
        }
        let fault = system.faults().get(fault);
        if fault.is_external() {
            self.decorate_external_fault(fault.name(), mode);
        }

        let occurrence = format!("{}{}", fault.name(), self.config.occurrence_suffix);
        let transition = transition_name(&occurrence);
        self.net.add_place(&occurrence);
        self.net.add_place(fault.name());
        self.marking.set_tokens(&occurrence, 1);
        self.net.add_transition(&transition).set_delay(Delay::dirac(timestamp));
        self.net.add_precondition(&occurrence, &transition);
        self.net.add_postcondition(&transition, fault.name());
        Ok(())
    }

    /// Rewires the producers of an external fault so that the forced
    /// occurrence either races with them or replaces them.
    fn decorate_external_fault(&mut self, fault: &str, mode: DecorationMode) {
        let occurrence = format!("{}{}", fault, self.config.occurrence_suffix);
        let occurrence_transition = transition_name(&occurrence);
        self.net.add_place(fault);

        let producers: Vec<String> = self
            .net
            .producers_of(fault)
            .into_iter()
            .filter(|&t| t != occurrence_transition)
            .map(str::to_string)
            .collect();
        let guard = format!("({}==0)", fault);

        match mode {
            DecorationMode::Concurrent => {
                for producer in &producers {
                    if self.net.outputs_of(producer).len() > 1 {
                        let staging = format!("To{}", fault);
                        let forward = transition_name(fault);
                        self.net.remove_postcondition(producer, fault);
                        self.net.add_place(&staging);
                        self.net.add_postcondition(producer, &staging);
                        self.net
                            .add_transition(&forward)
                            .set_enabling_function(guard.clone())
                            .set_delay(Delay::deterministic(0.0));
                        self.net.add_precondition(&staging, &forward);
                        self.net.add_postcondition(&forward, fault);
                    } else if let Some(t) = self.net.transition_mut(producer) {
                        t.set_enabling_function(guard.clone());
                    }
                }
                self.net.add_transition(&occurrence_transition).set_enabling_function(guard);
            }
            DecorationMode::Deterministic => {
                let mut removed = Vec::new();
                for producer in &producers {
                    let exclusive = self.net.outputs_of(producer).len() == 1;
                    self.net.remove_postcondition(producer, fault);
                    if exclusive {
                        self.navigate_back(producer, &mut removed);
                    }
                }
                for transition in &removed {
                    self.net.remove_transition(transition);
                }
                trace!("forced `{}` replaced {} transitions", fault, removed.len());
            }
        }
    }

    /// Collects `transition` and everything upstream of it whose only
    /// purpose was to enable it, removing the places in between.
    fn navigate_back(&mut self, transition: &str, removed: &mut Vec<String>) {
        if removed.iter().any(|t| t == transition) {
            return;
        }
        removed.push(transition.to_string());

        let inputs: Vec<String> = self.net.inputs_of(transition).into_iter().map(str::to_string).collect();
        for place in inputs {
            let orphaned = self
                .net
                .consumers_of(&place)
                .into_iter()
                .all(|consumer| removed.iter().any(|t| t == consumer));
            if !orphaned {
                continue;
            }
            let producers: Vec<String> = self.net.producers_of(&place).into_iter().map(str::to_string).collect();
            self.net.remove_place(&place);
            self.marking.remove(&place);
            for producer in producers {
                self.navigate_back(&producer, removed);
            }
        }
    }

    fn decorate_failure(
        &mut self,
        system: &System,
        failure: FailureModeId,
        timestamp: f64,
        mode: DecorationMode,
    ) -> Result<()> {
        if failure.index() >= system.failure_modes().count() {
            return Err(Error::UnknownFailureMode(failure.to_string()));
        }
        let failure_id = failure;
        let failure = system.failure_mode(failure_id).description();
        if !self.net.has_place(failure) {
            warn!("failure `{}` is not in the net, ignoring its occurrence", failure);
            return Ok(());
        }

        let occurrence = format!("{}{}", failure, self.config.occurrence_suffix);
        let transition = transition_name(&occurrence);
        self.net.add_place(&occurrence);
        self.marking.set_tokens(&occurrence, 1);
        self.net.add_transition(&transition).set_delay(Delay::dirac(timestamp));
        self.net.add_precondition(&occurrence, &transition);
        self.net.add_postcondition(&transition, failure);

        let error_transitions: Vec<String> = system
            .producers_of(failure_id)
            .filter_map(|em| self.error_transitions.get(&em.id()).cloned())
            .collect();

        match mode {
            DecorationMode::Concurrent => {
                let guard = self.quiescence_guard(failure);
                self.net.add_transition(&transition).set_enabling_function(guard.clone());
                for name in &error_transitions {
                    if let Some(t) = self.net.transition_mut(name) {
                        let combined = match t.enabling_function() {
                            Some(existing) => format!("({})&&{}", existing, guard),
                            None => guard.clone(),
                        };
                        t.set_enabling_function(combined);
                    }
                }
            }
            DecorationMode::Deterministic => {
                for name in &error_transitions {
                    let inputs: Vec<String> = self.net.inputs_of(name).into_iter().map(str::to_string).collect();
                    for place in inputs {
                        self.net.remove_place(&place);
                        self.marking.remove(&place);
                    }
                    self.net.remove_transition(name);
                }
            }
        }
        Ok(())
    }

    /// `((F==0)&&(X==0)...)`: the failure place and every place its
    /// propagation transition feeds are empty.
    fn quiescence_guard(&self, failure: &str) -> String {
        let mut guard = format!("(({}==0)", failure);
        let propagation = format!("{}{}", failure, self.config.propagation_suffix);
        for place in self.net.outputs_of(&propagation) {
            guard.push_str(&format!("&&({}==0)", place));
        }
        guard.push(')');
        guard
    }

    fn decorate_error(&mut self, system: &System, error_mode: ErrorModeId, timestamp: f64) -> Result<()> {
        let transition = self
            .error_transitions
            .get(&error_mode)
            .cloned()
            .ok_or_else(|| Error::UnknownErrorMode(error_mode.to_string()))?;
        match self.net.transition_mut(&transition) {
            Some(t) => {
                t.set_delay(Delay::dirac(timestamp));
                Ok(())
            }
            None => {
                let name = system.error_mode(error_mode).name();
                warn!("error mode `{}` was removed by an earlier decoration", name);
                Ok(())
            }
        }
    }
}
