//! Fault modes and the request-scoped registry that names them.
//!
//! Parsing an activation function registers every unknown leaf as a new
//! internal fault mode. The registry that receives those registrations is an
//! ordinary value owned by the caller (usually a [`System`][crate::model::System]),
//! so two analyses never share mutable naming state.

use std::collections::HashMap;

use log::trace;

use crate::error::{Error, Result};
use crate::types::FaultModeId;

/// The two flavours of fault mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// A fault that arises inside its component, with an optional opaque
    /// time-to-fault distribution descriptor such as `exp(0.0001)`.
    Internal { distribution: Option<String> },
    /// A fault caused by another component's failure through a propagation port.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultMode {
    id: FaultModeId,
    name: String,
    kind: FaultKind,
}

impl FaultMode {
    pub fn id(&self) -> FaultModeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, FaultKind::Internal { .. })
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, FaultKind::External)
    }

    /// Distribution descriptor of an internal fault mode, if any.
    pub fn distribution(&self) -> Option<&str> {
        match &self.kind {
            FaultKind::Internal { distribution } => distribution.as_deref(),
            FaultKind::External => None,
        }
    }

    /// Returns the internal view of this fault mode, as wrapped by basic events.
    pub fn as_internal(&self) -> Option<InternalFaultMode> {
        match &self.kind {
            FaultKind::Internal { distribution } => Some(InternalFaultMode {
                name: self.name.clone(),
                distribution: distribution.clone(),
            }),
            FaultKind::External => None,
        }
    }
}

/// An internal fault mode detached from its registry.
///
/// Basic events own one of these so that a fault mode can be swapped out
/// (e.g. for a `dirac(0)` variant) and later restored without touching the
/// model it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalFaultMode {
    pub name: String,
    pub distribution: Option<String>,
}

impl InternalFaultMode {
    pub fn new(name: impl Into<String>, distribution: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distribution: Some(distribution.into()),
        }
    }

    /// A fault mode that has already occurred at time zero.
    pub fn occurred(name: impl Into<String>) -> Self {
        Self::new(name, "dirac(0)")
    }
}

/// Name-indexed arena of fault modes.
#[derive(Debug, Clone, Default)]
pub struct FaultRegistry {
    faults: Vec<FaultMode>,
    by_name: HashMap<String, FaultModeId>,
}

impl FaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Returns the fault mode with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    pub fn get(&self, id: FaultModeId) -> &FaultMode {
        &self.faults[id.index()]
    }

    pub fn name(&self, id: FaultModeId) -> &str {
        &self.faults[id.index()].name
    }

    pub fn lookup(&self, name: &str) -> Option<FaultModeId> {
        self.by_name.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<FaultModeId> {
        self.lookup(name).ok_or_else(|| Error::UnknownFaultMode(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaultMode> {
        self.faults.iter()
    }

    /// Resolves a leaf name, registering a new internal fault mode (without
    /// distribution) when the name is unknown.
    pub fn resolve_or_insert(&mut self, name: &str) -> FaultModeId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        trace!("registering implicit fault mode `{}`", name);
        self.push(name, FaultKind::Internal { distribution: None })
    }

    /// Drops every fault mode registered after the registry held `len` entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        for fault in self.faults.drain(len.min(self.faults.len())..) {
            self.by_name.remove(&fault.name);
        }
    }

    /// Declares an internal fault mode, or attaches a distribution to one that
    /// parsing registered implicitly.
    pub fn declare_internal(&mut self, name: &str, distribution: Option<&str>) -> Result<FaultModeId> {
        match self.lookup(name) {
            None => Ok(self.push(
                name,
                FaultKind::Internal {
                    distribution: distribution.map(str::to_string),
                },
            )),
            Some(id) => {
                let fault = &mut self.faults[id.index()];
                match &mut fault.kind {
                    FaultKind::Internal { distribution: current } => {
                        if let Some(d) = distribution {
                            *current = Some(d.to_string());
                        }
                        Ok(id)
                    }
                    FaultKind::External => Err(Error::DuplicateName {
                        kind: "external fault mode",
                        name: name.to_string(),
                    }),
                }
            }
        }
    }

    /// Declares an external fault mode.
    ///
    /// A name that parsing registered implicitly (internal, no distribution)
    /// is converted; a declared internal fault mode is a conflict.
    pub fn declare_external(&mut self, name: &str) -> Result<FaultModeId> {
        match self.lookup(name) {
            None => Ok(self.push(name, FaultKind::External)),
            Some(id) => {
                let fault = &mut self.faults[id.index()];
                match fault.kind {
                    FaultKind::External => Ok(id),
                    FaultKind::Internal { distribution: None } => {
                        fault.kind = FaultKind::External;
                        Ok(id)
                    }
                    FaultKind::Internal { .. } => Err(Error::DuplicateName {
                        kind: "internal fault mode",
                        name: name.to_string(),
                    }),
                }
            }
        }
    }

    fn push(&mut self, name: &str, kind: FaultKind) -> FaultModeId {
        let id = FaultModeId::from_index(self.faults.len());
        self.faults.push(FaultMode {
            id,
            name: name.to_string(),
            kind,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }
}
