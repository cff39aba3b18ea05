//! Error types for QBayes inference.

use thiserror::Error;

impl From<qbayes_network::NetworkError> for InferenceError {
    fn from(err: qbayes_network::NetworkError) -> Self {
        use qbayes_network::NetworkError;
        match err {
            NetworkError::UnknownVariable(name) => InferenceError::UnknownVariable(name),
            NetworkError::ValueOutOfRange {
                variable,
                value,
                cardinality,
            } => InferenceError::ValueOutOfRange {
                variable,
                value,
                cardinality,
            },
            other => InferenceError::InvalidNetwork(other.to_string()),
        }
    }
}

/// Errors that can occur while building circuits, simulating, or inferring.
///
/// This enum is marked `#[non_exhaustive]` so new variants can be added
/// without breaking callers. Every public API returns `Result<T, InferenceError>`
/// instead of panicking on user input.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Malformed cardinalities, CPT shapes, or network structure.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// A CPT row does not sum to 1 within tolerance.
    #[error("unnormalized distribution for '{variable}' row {row}: sums to {sum}")]
    UnnormalizedDistribution {
        variable: String,
        row: usize,
        sum: f64,
    },

    /// Evidence or query references a variable absent from the network.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Evidence or query value is outside the variable's state space.
    #[error("value {value} out of range for '{variable}' (cardinality {cardinality})")]
    ValueOutOfRange {
        variable: String,
        value: usize,
        cardinality: usize,
    },

    /// No sample survived evidence filtering.
    ///
    /// For impossible or very unlikely evidence a larger shot budget may help.
    /// For likely evidence (probability above 1/2) the default single Grover
    /// iterate can rotate past the evidence subspace and drive acceptance to
    /// zero; more shots cannot fix that, `InferenceConfig::with_grover_iterations(0)`
    /// does.
    #[error("no samples consistent with the evidence")]
    NoValidSamples,

    /// Inference was requested with neither evidence nor prior samples.
    #[error("inference requested without evidence and without prior rejection samples")]
    StaleState,

    /// Gate or qubit index misuse, or inverting a non-unitary circuit.
    #[error("invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Simulation backend failure.
    #[error("simulation error: {0}")]
    Simulation(String),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}
