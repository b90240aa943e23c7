//! Structural stochastic Petri nets.
//!
//! Places and transitions are indexed by name, in insertion order. Adding an
//! element whose name already exists returns the existing one, which is what
//! lets the translator visit a fault mode from several error modes and still
//! produce one place for it.
//!
//! The net is structural: enabling functions and delays are carried as
//! annotations for an external solver and are never evaluated here.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

/// Firing delay of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Delay {
    /// Opaque distribution descriptor such as `exp(0.01)` or `dirac(3)`.
    Distribution(String),
    /// Fixed delay `value`; `weight` resolves races between transitions that
    /// become firable at the same time.
    Deterministic { value: f64, weight: String },
}

impl Delay {
    pub fn distribution(descriptor: impl Into<String>) -> Self {
        Delay::Distribution(descriptor.into())
    }

    /// Deterministic delay with unit weight.
    pub fn deterministic(value: f64) -> Self {
        Delay::Deterministic {
            value,
            weight: "1".to_string(),
        }
    }

    pub fn weighted(value: f64, weight: impl Into<String>) -> Self {
        Delay::Deterministic {
            value,
            weight: weight.into(),
        }
    }

    /// Fires exactly at time `t`.
    pub fn dirac(t: f64) -> Self {
        Delay::Distribution(format!("dirac({})", t))
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Distribution(descriptor) => write!(f, "{}", descriptor),
            Delay::Deterministic { value, weight } => write!(f, "deterministic({}) weight {}", value, weight),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    name: String,
}

impl Place {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    name: String,
    enabling_function: Option<String>,
    delay: Option<Delay>,
    priority: Option<u32>,
}

impl Transition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Boolean guard over the marking, e.g. `(A>0)&&(B>0)`.
    pub fn enabling_function(&self) -> Option<&str> {
        self.enabling_function.as_deref()
    }

    pub fn delay(&self) -> Option<&Delay> {
        self.delay.as_ref()
    }

    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    pub fn set_enabling_function(&mut self, enabling_function: impl Into<String>) -> &mut Self {
        self.enabling_function = Some(enabling_function.into());
        self
    }

    pub fn clear_enabling_function(&mut self) -> Option<String> {
        self.enabling_function.take()
    }

    pub fn set_delay(&mut self, delay: Delay) -> &mut Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_priority(&mut self, priority: u32) -> &mut Self {
        self.priority = Some(priority);
        self
    }
}

/// Token count per place; places not listed hold no tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marking {
    tokens: IndexMap<String, u32>,
}

impl Marking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tokens(&mut self, place: &str, tokens: u32) {
        self.tokens.insert(place.to_string(), tokens);
    }

    pub fn tokens(&self, place: &str) -> u32 {
        self.tokens.get(place).copied().unwrap_or(0)
    }

    pub fn remove(&mut self, place: &str) {
        self.tokens.shift_remove(place);
    }

    /// Marked places with their token counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.tokens
            .iter()
            .filter(|(_, &tokens)| tokens > 0)
            .map(|(place, &tokens)| (place.as_str(), tokens))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetriNet {
    places: IndexMap<String, Place>,
    transitions: IndexMap<String, Transition>,
    /// `(place, transition)` input arcs.
    preconditions: IndexSet<(String, String)>,
    /// `(transition, place)` output arcs.
    postconditions: IndexSet<(String, String)>,
}

// Places and transitions
impl PetriNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a place, or returns the existing place with that name.
    pub fn add_place(&mut self, name: &str) -> &Place {
        self.places.entry(name.to_string()).or_insert_with(|| Place {
            name: name.to_string(),
        })
    }

    /// Adds a transition, or returns the existing transition with that name.
    pub fn add_transition(&mut self, name: &str) -> &mut Transition {
        self.transitions.entry(name.to_string()).or_insert_with(|| Transition {
            name: name.to_string(),
            enabling_function: None,
            delay: None,
            priority: None,
        })
    }

    pub fn place(&self, name: &str) -> Option<&Place> {
        self.places.get(name)
    }

    pub fn has_place(&self, name: &str) -> bool {
        self.places.contains_key(name)
    }

    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.transitions.get(name)
    }

    pub fn transition_mut(&mut self, name: &str) -> Option<&mut Transition> {
        self.transitions.get_mut(name)
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Removes a place together with every arc touching it.
    pub fn remove_place(&mut self, name: &str) -> Option<Place> {
        let place = self.places.shift_remove(name)?;
        self.preconditions.retain(|(p, _)| p != name);
        self.postconditions.retain(|(_, p)| p != name);
        Some(place)
    }

    /// Removes a transition together with every arc touching it.
    pub fn remove_transition(&mut self, name: &str) -> Option<Transition> {
        let transition = self.transitions.shift_remove(name)?;
        self.preconditions.retain(|(_, t)| t != name);
        self.postconditions.retain(|(t, _)| t != name);
        Some(transition)
    }
}

// Arcs
impl PetriNet {
    /// Adds an input arc from `place` to `transition`.
    pub fn add_precondition(&mut self, place: &str, transition: &str) {
        self.preconditions.insert((place.to_string(), transition.to_string()));
    }

    /// Adds an output arc from `transition` to `place`.
    pub fn add_postcondition(&mut self, transition: &str, place: &str) {
        self.postconditions.insert((transition.to_string(), place.to_string()));
    }

    pub fn remove_precondition(&mut self, place: &str, transition: &str) -> bool {
        self.preconditions
            .shift_remove(&(place.to_string(), transition.to_string()))
    }

    pub fn remove_postcondition(&mut self, transition: &str, place: &str) -> bool {
        self.postconditions
            .shift_remove(&(transition.to_string(), place.to_string()))
    }

    pub fn has_precondition(&self, place: &str, transition: &str) -> bool {
        self.preconditions.iter().any(|(p, t)| p == place && t == transition)
    }

    pub fn has_postcondition(&self, transition: &str, place: &str) -> bool {
        self.postconditions.iter().any(|(t, p)| t == transition && p == place)
    }

    pub fn preconditions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.preconditions.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    pub fn postconditions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.postconditions.iter().map(|(t, p)| (t.as_str(), p.as_str()))
    }

    /// Input places of `transition`.
    pub fn inputs_of(&self, transition: &str) -> Vec<&str> {
        self.preconditions
            .iter()
            .filter(|(_, t)| t == transition)
            .map(|(p, _)| p.as_str())
            .collect()
    }

    /// Output places of `transition`.
    pub fn outputs_of(&self, transition: &str) -> Vec<&str> {
        self.postconditions
            .iter()
            .filter(|(t, _)| t == transition)
            .map(|(_, p)| p.as_str())
            .collect()
    }

    /// Transitions with an output arc into `place`.
    pub fn producers_of(&self, place: &str) -> Vec<&str> {
        self.postconditions
            .iter()
            .filter(|(_, p)| p == place)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Transitions with an input arc from `place`.
    pub fn consumers_of(&self, place: &str) -> Vec<&str> {
        self.preconditions
            .iter()
            .filter(|(p, _)| p == place)
            .map(|(_, t)| t.as_str())
            .collect()
    }
}
