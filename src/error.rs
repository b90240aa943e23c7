//! Error type shared by every analysis in the crate.
//!
//! All errors are deterministic and structural: they describe a model or an
//! expression that cannot be processed, never a transient condition, so
//! nothing here is worth retrying.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The boolean expression text does not parse.
    #[error("malformed expression `{expression}`: {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// Fault-tree construction re-entered an error mode that is still being
    /// unrolled, i.e. the propagation graph has a cycle through it.
    #[error("error mode `{error_mode}` is repeated along its own propagation chain")]
    RepeatedEvent { error_mode: String },

    /// An external fault mode has no propagation port (or no error mode)
    /// that produces it.
    #[error("external fault mode `{fault_mode}` is not produced by any propagation port")]
    UnresolvedPropagation { fault_mode: String },

    /// A basic event was inserted twice into one cut set.
    #[error("basic event `{event}` is already part of the cut set")]
    IllegalCutSetInsertion { event: String },

    /// Fault trees are coherent: negation has no gate counterpart.
    #[error("negation in `{expression}` has no fault-tree gate")]
    NonCoherentGate { expression: String },

    #[error("MOCUS expansion exceeded the limit of {limit} paths")]
    PathLimitExceeded { limit: usize },

    #[error("routing probability {value} is outside (0, 1]")]
    InvalidRoutingProbability { value: f64 },

    #[error("name `{name}` is already used by another {kind}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unknown fault mode `{0}`")]
    UnknownFaultMode(String),

    #[error("unknown failure mode `{0}`")]
    UnknownFailureMode(String),

    #[error("unknown error mode `{0}`")]
    UnknownErrorMode(String),

    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    /// Adding the composition edge would make the hierarchy cyclic.
    #[error("component `{child}` cannot be composed into `{parent}`: the hierarchy would become cyclic")]
    CompositionCycle { parent: String, child: String },

    /// Failure reported by an external solver or sampler.
    #[error("solver failed: {0}")]
    Solver(String),
}

impl Error {
    pub(crate) fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Error::MalformedExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
