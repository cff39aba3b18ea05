//! Error types for network construction.

use thiserror::Error;

/// Errors raised while building or querying a [`crate::BayesianNetwork`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// A variable is malformed on its own (empty name, cardinality < 2).
    #[error("invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },

    /// Two variables share a name.
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    /// A variable lists a parent that is not part of the network.
    #[error("variable '{variable}' references unknown parent '{parent}'")]
    UnknownParent { variable: String, parent: String },

    /// The parent relation contains a cycle through the named variable.
    #[error("parent relation contains a cycle through '{0}'")]
    Cycle(String),

    /// The conditional probability table has the wrong shape or bad entries.
    #[error("invalid CPT for '{variable}': {reason}")]
    InvalidCpt { variable: String, reason: String },

    /// An assignment references a variable the network does not contain.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// An assignment value falls outside the variable's state space.
    #[error("value {value} out of range for '{variable}' (cardinality {cardinality})")]
    ValueOutOfRange {
        variable: String,
        value: usize,
        cardinality: usize,
    },

    /// A full joint assignment was required but a variable was left unset.
    #[error("assignment does not set variable '{0}'")]
    IncompleteAssignment(String),
}
