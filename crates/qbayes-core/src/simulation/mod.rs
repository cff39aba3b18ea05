//! Simulation backends.
//!
//! The engine never simulates gates itself. It hands a measured [`Circuit`]
//! to a [`SimulationBackend`] and receives [`SampleCounts`] back. The
//! [`statevector`] module provides the reference dense-statevector backend.
//!
//! ## Bitstring convention
//!
//! A bitstring has one `'0'`/`'1'` character per qubit, and character `k` is
//! the measured value of qubit `k`.

use std::collections::BTreeMap;

use crate::circuit::Circuit;
use crate::engine::errors::InferenceError;

pub mod statevector;

pub use statevector::{Statevector, StatevectorBackend, StatevectorConfig};

/// Observed joint bitstring -> number of shots that produced it.
pub type SampleCounts = BTreeMap<String, u64>;

/// Executes measured circuits.
///
/// `run` must be atomic from the caller's point of view: it returns the
/// complete counts for all `shots` or an error. Implementations may block for
/// as long as the simulation takes; cancellation is their concern.
pub trait SimulationBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn run(&self, circuit: &Circuit, shots: u64) -> Result<SampleCounts, InferenceError>;
}

/// Formats basis index `index` as a bitstring over `num_qubits` qubits.
pub fn bitstring(index: usize, num_qubits: usize) -> String {
    format!("{:0width$b}", index, width = num_qubits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitstring_is_zero_padded_qubit_zero_first() {
        assert_eq!(bitstring(0, 3), "000");
        assert_eq!(bitstring(1, 3), "001");
        assert_eq!(bitstring(4, 3), "100");
    }
}
