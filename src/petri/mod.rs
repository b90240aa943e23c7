//! Stochastic Petri-net encoding of fault propagation.
//!
//! [`PetriNetTranslator`] turns a [`System`][crate::model::System] into a
//! structural [`PetriNet`] with an initial [`Marking`]; a [`Scenario`] then
//! replays timed operational events onto it, and a [`MarkingReducer`]
//! restricts the marking to the threat chain of one failure. Solving the net
//! is left to an external tool.

pub mod net;
pub mod reduce;
pub mod scenario;
pub mod translator;

pub use net::{Delay, Marking, PetriNet, Place, Transition};
pub use reduce::{reduce_marking, MarkingReducer, ThreatChain};
pub use scenario::{DecorationMode, Event, Scenario};
pub use translator::{transition_name, DelaySampler, PetriNetTranslator, TranslatorConfig};
