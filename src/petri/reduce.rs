//! Reduction of a Petri-net marking to the threat chain of one failure.
//!
//! The threat chain of a failure mode collects the error modes producing it,
//! the fault modes their activations read and, through propagation ports,
//! the threat chains of the upstream failures behind external faults.
//! [`MarkingReducer`] empties every marked place outside that chain, so the
//! net only evolves along the paths that can lead to the failure.

use std::collections::HashSet;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::model::System;
use crate::petri::net::Marking;
use crate::petri::translator::TranslatorConfig;
use crate::types::{ErrorModeId, FailureModeId, FaultModeId};

/// Entities that can contribute to a failure mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatChain {
    failures: Vec<FailureModeId>,
    error_modes: Vec<ErrorModeId>,
    faults: Vec<FaultModeId>,
}

impl ThreatChain {
    /// Walks the chain upstream from `failure`. Cyclic propagation is
    /// visited once.
    pub fn of(system: &System, failure: FailureModeId) -> Result<Self> {
        if system.failure_modes().all(|f| f.id() != failure) {
            return Err(Error::UnknownFailureMode(failure.to_string()));
        }

        let mut chain = ThreatChain::default();
        let mut seen_failures = HashSet::new();
        let mut seen_faults = HashSet::new();
        let mut stack = vec![failure];
        while let Some(current) = stack.pop() {
            if !seen_failures.insert(current) {
                continue;
            }
            chain.failures.push(current);
            for error_mode in system.producers_of(current) {
                chain.error_modes.push(error_mode.id());
                for fault in error_mode.input_fault_modes() {
                    if !seen_faults.insert(fault) {
                        continue;
                    }
                    chain.faults.push(fault);
                    if system.faults().get(fault).is_external() {
                        stack.extend(system.ports_feeding(fault).map(|port| port.propagated_failure()));
                    }
                }
            }
        }
        Ok(chain)
    }

    pub fn failures(&self) -> &[FailureModeId] {
        &self.failures
    }

    pub fn error_modes(&self) -> &[ErrorModeId] {
        &self.error_modes
    }

    pub fn faults(&self) -> &[FaultModeId] {
        &self.faults
    }

    /// Names of the net places belonging to the chain, occurrence places
    /// included.
    pub fn places(&self, system: &System, config: &TranslatorConfig) -> HashSet<String> {
        let mut places = HashSet::new();
        for &em in &self.error_modes {
            places.insert(system.error_mode(em).name().to_string());
        }
        let failures = self.failures.iter().map(|&f| system.failure_mode(f).description());
        let faults = self.faults.iter().map(|&f| system.faults().name(f));
        for name in failures.chain(faults) {
            places.insert(format!("{}{}", name, config.occurrence_suffix));
            places.insert(name.to_string());
        }
        places
    }
}

/// Empties the marked places that cannot contribute to a failure mode.
#[derive(Debug, Clone, Default)]
pub struct MarkingReducer {
    config: TranslatorConfig,
}

impl MarkingReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The config must match the one the net was translated with.
    pub fn with_config(config: TranslatorConfig) -> Self {
        Self { config }
    }

    /// Sets to zero every marked place outside the threat chain of `failure`
    /// and returns the names of those places.
    pub fn reduce(&self, system: &System, failure: FailureModeId, marking: &mut Marking) -> Result<Vec<String>> {
        let chain = ThreatChain::of(system, failure)?;
        let kept = chain.places(system, &self.config);

        let emptied: Vec<String> = marking
            .iter()
            .filter(|(place, _)| !kept.contains(*place))
            .map(|(place, _)| place.to_string())
            .collect();
        for place in &emptied {
            trace!("emptying `{}`", place);
            marking.set_tokens(place, 0);
        }
        debug!(
            "reduced marking to the chain of `{}`: {} places kept, {} emptied",
            system.failure_mode(failure).description(),
            kept.len(),
            emptied.len()
        );
        Ok(emptied)
    }
}

/// Reduces `marking` to the threat chain of `failure`, using the default
/// translator naming.
pub fn reduce_marking(system: &System, failure: FailureModeId, marking: &mut Marking) -> Result<Vec<String>> {
    MarkingReducer::new().reduce(system, failure, marking)
}
