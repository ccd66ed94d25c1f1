//! Error types for neurosym

use thiserror::Error;

/// Neurosym error type
///
/// Every failure is deterministic given identical inputs; there is no
/// transient-failure or retry concept in the assembly phase.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Gate built from named arguments whose names match no rate-law set
    #[error("invalid keyword arguments: {0:?}")]
    InvalidGateArguments(Vec<String>),

    /// Gate built from other than two named equations
    #[error("invalid number of input equations: expected 2, got {0}")]
    InvalidGateEquationCount(usize),

    /// Two gates in one conductance share a state symbol
    #[error("duplicate gate symbol '{0}' in conductance")]
    DuplicateGate(String),

    /// Two channel instances in one compartment share a name
    #[error("duplicate channel '{0}' in compartment")]
    DuplicateChannel(String),

    /// Two compartments in one network share a name
    #[error("duplicate compartment '{0}' in network")]
    DuplicateCompartment(String),

    /// A topology edge references a compartment the network does not contain
    #[error("unknown compartment '{0}' in topology")]
    UnknownCompartment(String),

    /// No equilibrium potential entry matches a channel's ion type
    #[error("no equilibrium potential for ion {ion} (channel '{channel}')")]
    MissingEquilibrium { ion: String, channel: String },

    /// Required states left undefined after aggregator-current resolution
    #[error("unresolved states {names:?} in {context}")]
    UnresolvedStates { names: Vec<String>, context: String },

    /// A default value could not be resolved to a number
    #[error("default for '{0}' could not be resolved numerically")]
    UnresolvedDefault(String),

    /// Numeric evaluation hit a symbol with no bound value
    #[error("undefined symbol '{0}' during evaluation")]
    UndefinedSymbol(String),

    /// Host-function application with the wrong number of arguments
    #[error("function '{name}' applied to {got} arguments, expected {expected}")]
    BadArity {
        name: String,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
