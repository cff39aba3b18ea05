//! Amplitude amplification.
//!
//! One Grover iterate is `Q = A · S₀ · A† · S_e`: the evidence oracle `S_e`,
//! then the inverse state preparation, a phase flip about `|0…0⟩`, and the
//! state preparation again. Applied to `A|0⟩ = sin θ |good⟩ + cos θ |bad⟩` it
//! yields `sin 3θ |good⟩ + cos 3θ |bad⟩` up to global phase.
//!
//! The engine applies a fixed number of iterates (one by default) and does not
//! search for the optimal count. For evidence probability `p` the accepted
//! fraction after one iterate is `sin²(3·asin √p)`: larger than `p` while
//! `p < 1/2` (reaching 1 at `p = 1/4`), equal at `p = 1/2`, and potentially
//! much smaller above it. Amplification scales every evidence-consistent amplitude by
//! the same factor, so conditional ratios inside that subspace are unchanged
//! regardless of the count.

use crate::circuit::Circuit;
use crate::engine::errors::InferenceError;

/// Phase flip of `|0…0⟩`: X on every qubit, multi-controlled Z, X again.
pub fn build_zero_reflection(num_qubits: usize) -> Result<Circuit, InferenceError> {
    let mut circuit = Circuit::new(num_qubits);
    if num_qubits == 0 {
        return Ok(circuit);
    }
    for q in 0..num_qubits {
        circuit.x(q)?;
    }
    let controls: Vec<usize> = (0..num_qubits - 1).collect();
    circuit.mcz(&controls, num_qubits - 1)?;
    for q in 0..num_qubits {
        circuit.x(q)?;
    }
    Ok(circuit)
}

/// One Grover iterate around `oracle` and `state_prep`.
pub fn build_grover_iterate(
    oracle: &Circuit,
    state_prep: &Circuit,
) -> Result<Circuit, InferenceError> {
    if oracle.num_qubits() != state_prep.num_qubits() {
        return Err(InferenceError::InvalidCircuit(format!(
            "oracle has {} qubits, state preparation has {}",
            oracle.num_qubits(),
            state_prep.num_qubits()
        )));
    }
    let mut iterate = oracle.clone();
    iterate.append(&state_prep.inverse()?)?;
    iterate.append(&build_zero_reflection(state_prep.num_qubits())?)?;
    iterate.append(state_prep)?;
    Ok(iterate)
}

/// `state_prep` followed by `iterations` Grover iterates. Not measured.
pub fn build_amplified_circuit(
    state_prep: &Circuit,
    oracle: &Circuit,
    iterations: usize,
) -> Result<Circuit, InferenceError> {
    let mut circuit = state_prep.clone();
    if iterations == 0 {
        return Ok(circuit);
    }
    let iterate = build_grover_iterate(oracle, state_prep)?;
    for _ in 0..iterations {
        circuit.append(&iterate)?;
    }
    Ok(circuit)
}
