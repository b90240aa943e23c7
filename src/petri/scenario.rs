//! Operational scenarios: timed events replayed onto a translated net.

use std::collections::HashSet;

use log::debug;

use crate::error::Result;
use crate::model::System;
use crate::petri::translator::{DelaySampler, PetriNetTranslator};
use crate::types::{ErrorModeId, FailureModeId, FaultModeId};

/// An operational event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// The fault mode occurs.
    Fault(FaultModeId),
    /// The failure mode manifests regardless of its error modes.
    Failure(FailureModeId),
    /// The error mode propagates to its failure after a fixed delay.
    Error(ErrorModeId),
}

/// How a forced occurrence relates to the net's own dynamics.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum DecorationMode {
    /// The forced occurrence races with the modelled causes; whichever fires
    /// first disables the other.
    #[default]
    Concurrent,
    /// The forced occurrence replaces the modelled causes.
    Deterministic,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    events: Vec<(Event, f64)>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// One fault event per internal fault with a distribution read by any
    /// error mode, timestamped with a draw from `sampler`.
    pub fn from_system(system: &System, sampler: &mut dyn DelaySampler) -> Result<Self> {
        let mut scenario = Self::new();
        let mut seen = HashSet::new();
        for component in system.components() {
            for &em in component.error_modes() {
                for fault in system.error_mode(em).input_fault_modes() {
                    if !seen.insert(fault) {
                        continue;
                    }
                    if let Some(distribution) = system.faults().get(fault).distribution() {
                        let timestamp = sampler.sample(distribution)?;
                        scenario.add_event(Event::Fault(fault), timestamp);
                    }
                }
            }
        }
        debug!("initialized scenario with {} fault events", scenario.len());
        Ok(scenario)
    }

    pub fn add_event(&mut self, event: Event, timestamp: f64) {
        self.events.push((event, timestamp));
    }

    /// Removes every occurrence of `event`; returns whether any was present.
    pub fn remove_event(&mut self, event: Event) -> bool {
        let before = self.events.len();
        self.events.retain(|&(e, _)| e != event);
        self.events.len() != before
    }

    pub fn events(&self) -> &[(Event, f64)] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Decorates the net held by `translator` with every event, in insertion
    /// order.
    pub fn accept(&self, system: &System, translator: &mut PetriNetTranslator, mode: DecorationMode) -> Result<()> {
        for &(event, timestamp) in &self.events {
            translator.decorate(system, event, timestamp, mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::petri::net::Delay;

    /// `Source` fails on `Wear`; its failure reaches `Sink` as `Inflow`.
    fn chain() -> System {
        let mut system = System::new("chain");
        let source = system.add_component("Source").unwrap();
        let sink = system.add_component("Sink").unwrap();
        system.add_internal_fault("Wear", Some("exp(0.5)")).unwrap();
        let out = system.add_failure_mode("Out").unwrap();
        let down = system.add_failure_mode("Down").unwrap();
        system.add_error_mode(source, "SourceErr", "Wear", out, None).unwrap();
        system
            .add_error_mode(sink, "SinkErr", "Inflow || Rust", down, Some("exp(2)"))
            .unwrap();
        let inflow = system.faults().require("Inflow").unwrap();
        system.add_propagation_port(source, out, inflow, sink, 1.0).unwrap();
        system
    }

    fn translated(system: &System) -> PetriNetTranslator {
        let mut translator = PetriNetTranslator::new();
        translator.translate(system).unwrap();
        translator
    }

    #[test]
    fn test_from_system() {
        let system = chain();
        let mut sampler = |_: &str| -> Result<f64> { Ok(3.0) };
        let scenario = Scenario::from_system(&system, &mut sampler).unwrap();
        // Rust has no distribution; Inflow is external.
        let wear = system.faults().require("Wear").unwrap();
        assert_eq!(scenario.events(), [(Event::Fault(wear), 3.0)]);
    }

    #[test]
    fn test_internal_fault_occurrence() {
        let system = chain();
        let mut translator = translated(&system);
        let wear = system.faults().require("Wear").unwrap();

        let mut scenario = Scenario::new();
        scenario.add_event(Event::Fault(wear), 2.5);
        scenario.accept(&system, &mut translator, DecorationMode::Concurrent).unwrap();

        let t = translator.net().transition("wearOccurrence").unwrap();
        assert_eq!(t.delay(), Some(&Delay::dirac(2.5)));
        assert_eq!(translator.marking().tokens("WearOccurrence"), 1);
    }

    #[test]
    fn test_external_fault_concurrent() {
        let system = chain();
        let mut translator = translated(&system);
        let inflow = system.faults().require("Inflow").unwrap();
        translator
            .decorate(&system, Event::Fault(inflow), 1.0, DecorationMode::Concurrent)
            .unwrap();
        let net = translator.net();

        let occurrence = net.transition("inflowOccurrence").unwrap();
        assert_eq!(occurrence.enabling_function(), Some("(Inflow==0)"));
        assert_eq!(occurrence.delay(), Some(&Delay::dirac(1.0)));
        assert_eq!(net.inputs_of("inflowOccurrence"), ["InflowOccurrence"]);
        assert_eq!(net.outputs_of("inflowOccurrence"), ["Inflow"]);

        // The propagation transition only feeds Inflow, so it is guarded in place.
        let propagation = net.transition("OuttoFaults").unwrap();
        assert_eq!(propagation.enabling_function(), Some("(Inflow==0)"));
        assert!(net.has_postcondition("OuttoFaults", "Inflow"));
    }

    #[test]
    fn test_external_fault_concurrent_with_shared_producer() {
        let mut system = chain();
        let source = system.component_by_name("Source").unwrap();
        let sink = system.component_by_name("Sink").unwrap();
        let out = system.failure_mode_by_name("Out").unwrap();
        let spill = system.add_external_fault("Spill").unwrap();
        system.add_propagation_port(source, out, spill, sink, 1.0).unwrap();

        let mut translator = translated(&system);
        let inflow = system.faults().require("Inflow").unwrap();
        translator
            .decorate(&system, Event::Fault(inflow), 1.0, DecorationMode::Concurrent)
            .unwrap();
        let net = translator.net();

        assert!(!net.has_postcondition("OuttoFaults", "Inflow"));
        assert!(net.has_postcondition("OuttoFaults", "ToInflow"));
        assert!(net.has_postcondition("OuttoFaults", "Spill"));
        let forward = net.transition("inflow").unwrap();
        assert_eq!(forward.enabling_function(), Some("(Inflow==0)"));
        assert_eq!(net.inputs_of("inflow"), ["ToInflow"]);
        assert_eq!(net.outputs_of("inflow"), ["Inflow"]);
    }

    #[test]
    fn test_external_fault_deterministic() {
        let system = chain();
        let mut translator = translated(&system);
        let inflow = system.faults().require("Inflow").unwrap();
        translator
            .decorate(&system, Event::Fault(inflow), 1.0, DecorationMode::Deterministic)
            .unwrap();
        let net = translator.net();

        // The upstream chain that could only produce Inflow is gone.
        for removed in ["OuttoFaults", "out"] {
            assert!(net.transition(removed).is_none(), "{}", removed);
        }
        for removed in ["Out", "SourceErr"] {
            assert!(!net.has_place(removed), "{}", removed);
        }
        // Wear only guards `out`, it is not an input arc.
        assert!(net.has_place("Wear"));
        assert_eq!(translator.marking().tokens("SourceErr"), 0);
        assert_eq!(net.producers_of("Inflow"), ["inflowOccurrence"]);
        assert!(net.transition("down").is_some());
    }

    #[test]
    fn test_failure_concurrent() {
        let system = chain();
        let mut translator = translated(&system);
        let out = system.failure_mode_by_name("Out").unwrap();
        translator
            .decorate(&system, Event::Failure(out), 4.0, DecorationMode::Concurrent)
            .unwrap();
        let net = translator.net();

        let guard = "((Out==0)&&(Inflow==0))";
        let occurrence = net.transition("outOccurrence").unwrap();
        assert_eq!(occurrence.enabling_function(), Some(guard));
        assert_eq!(occurrence.delay(), Some(&Delay::dirac(4.0)));
        assert_eq!(translator.marking().tokens("OutOccurrence"), 1);

        let error = net.transition("out").unwrap();
        assert_eq!(error.enabling_function(), Some("(Wear>0)&&((Out==0)&&(Inflow==0))"));
    }

    #[test]
    fn test_failure_concurrent_guards_whole_disjunction() {
        let system = chain();
        let mut translator = translated(&system);
        let down = system.failure_mode_by_name("Down").unwrap();
        translator
            .decorate(&system, Event::Failure(down), 1.0, DecorationMode::Concurrent)
            .unwrap();

        let error = translator.net().transition("down").unwrap();
        assert_eq!(
            error.enabling_function(),
            Some("((Inflow>0)||(Rust>0))&&((Down==0))")
        );
    }

    #[test]
    fn test_failure_deterministic() {
        let system = chain();
        let mut translator = translated(&system);
        let out = system.failure_mode_by_name("Out").unwrap();
        translator
            .decorate(&system, Event::Failure(out), 4.0, DecorationMode::Deterministic)
            .unwrap();
        let net = translator.net();

        assert!(net.transition("out").is_none());
        assert!(!net.has_place("SourceErr"));
        assert_eq!(net.producers_of("Out"), ["outOccurrence"]);
    }

    #[test]
    fn test_error_delay() {
        let system = chain();
        let mut translator = translated(&system);
        let sink_err = system.error_mode_by_name("SinkErr").unwrap();
        translator
            .decorate(&system, Event::Error(sink_err), 7.0, DecorationMode::Concurrent)
            .unwrap();
        let t = translator.net().transition("down").unwrap();
        assert_eq!(t.delay(), Some(&Delay::dirac(7.0)));
    }

    #[test]
    fn test_untranslated_error_mode() {
        let system = chain();
        let mut translator = PetriNetTranslator::new();
        let sink_err = system.error_mode_by_name("SinkErr").unwrap();
        assert!(translator
            .decorate(&system, Event::Error(sink_err), 7.0, DecorationMode::Concurrent)
            .is_err());
    }

    #[test]
    fn test_remove_event() {
        let mut scenario = Scenario::new();
        let e = Event::Error(ErrorModeId::new(0));
        scenario.add_event(e, 1.0);
        scenario.add_event(Event::Failure(FailureModeId::new(0)), 2.0);
        assert!(scenario.remove_event(e));
        assert!(!scenario.remove_event(e));
        assert_eq!(scenario.len(), 1);
    }
}
