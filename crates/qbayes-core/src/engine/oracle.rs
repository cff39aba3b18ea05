//! Evidence oracle.
//!
//! The oracle applies a phase of `-1` to every basis state whose control
//! qubits hold the evidence bits and leaves every other state untouched.
//!
//! Marking follows the generalized Grover convention: every qubit that is not
//! an evidence control is a free qubit, and each free qubit `q` receives the
//! pair
//!
//! ```text
//! H(q) · MCX(controls, q) · H(q)      -- phase -1 where controls match and q = 1
//! X(q)
//! H(q) · MCX(controls, q) · H(q)      -- phase -1 where controls match and q = 0
//! X(q)
//! ```
//!
//! One pair flips the phase of the whole evidence-consistent subspace once.
//! Pairs compose multiplicatively, so when the free-qubit count is even one
//! extra pair is placed on the first free qubit to leave a net flip of `-1`.
//! With no free qubits the mark is a multi-controlled Z across the controls;
//! with no controls the oracle degenerates to a global phase flip.
//!
//! Controls that expect `0` are wrapped in an X sandwich around the whole
//! marking block.

use std::collections::BTreeSet;

use qbayes_network::Assignment;

use crate::circuit::Circuit;
use crate::engine::errors::InferenceError;
use crate::engine::registers::RegisterLayout;

/// Builds the phase oracle for raw control qubits and their expected bits.
pub fn build_evidence_oracle(
    num_qubits: usize,
    control_qubits: &[usize],
    evidence_values: &[bool],
) -> Result<Circuit, InferenceError> {
    if control_qubits.len() != evidence_values.len() {
        return Err(InferenceError::InvalidCircuit(format!(
            "oracle has {} control qubits but {} evidence bits",
            control_qubits.len(),
            evidence_values.len()
        )));
    }
    let controls: BTreeSet<usize> = control_qubits.iter().copied().collect();
    if controls.len() != control_qubits.len() {
        return Err(InferenceError::InvalidCircuit(
            "oracle control qubits must be distinct".into(),
        ));
    }
    if let Some(&q) = controls.iter().find(|&&q| q >= num_qubits) {
        return Err(InferenceError::InvalidCircuit(format!(
            "oracle control qubit {} out of range for {} qubits",
            q, num_qubits
        )));
    }

    let mut circuit = Circuit::new(num_qubits);
    let free: Vec<usize> = (0..num_qubits).filter(|q| !controls.contains(q)).collect();
    let zero_controls: Vec<usize> = control_qubits
        .iter()
        .zip(evidence_values)
        .filter(|(_, &bit)| !bit)
        .map(|(&q, _)| q)
        .collect();

    for &q in &zero_controls {
        circuit.x(q)?;
    }

    match free.first() {
        Some(&first) => {
            for &q in &free {
                mark_pair(&mut circuit, control_qubits, q)?;
            }
            if free.len() % 2 == 0 {
                mark_pair(&mut circuit, control_qubits, first)?;
            }
        }
        None => {
            if let Some((&last, rest)) = control_qubits.split_last() {
                circuit.mcz(rest, last)?;
            }
        }
    }

    for &q in &zero_controls {
        circuit.x(q)?;
    }

    Ok(circuit)
}

/// Builds the oracle for a named evidence assignment over `layout`.
pub fn build_oracle_for_evidence(
    layout: &RegisterLayout,
    evidence: &Assignment,
) -> Result<Circuit, InferenceError> {
    let (qubits, bits): (Vec<usize>, Vec<bool>) = layout.encode(evidence)?.into_iter().unzip();
    build_evidence_oracle(layout.num_qubits(), &qubits, &bits)
}

/// Flips the phase of the controls-match subspace using free qubit `q`.
fn mark_pair(circuit: &mut Circuit, controls: &[usize], q: usize) -> Result<(), InferenceError> {
    circuit.mcz(controls, q)?;
    circuit.x(q)?;
    circuit.mcz(controls, q)?;
    circuit.x(q)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{bitstring, Statevector};

    fn uniform(n: usize) -> Circuit {
        let mut c = Circuit::new(n);
        for q in 0..n {
            c.h(q).unwrap();
        }
        c
    }

    /// Applies the oracle to the uniform superposition and returns the sign of
    /// every basis amplitude.
    fn phases(oracle: &Circuit) -> Vec<(String, f64)> {
        let n = oracle.num_qubits();
        let state = Statevector::from_circuit(&uniform(n).compose(oracle).unwrap()).unwrap();
        state
            .amplitudes()
            .iter()
            .enumerate()
            .map(|(i, a)| (bitstring(i, n), a.re.signum()))
            .collect()
    }

    fn assert_marks(oracle: &Circuit, pred: impl Fn(&str) -> bool) {
        for (bits, sign) in phases(oracle) {
            let expected = if pred(&bits) { -1.0 } else { 1.0 };
            assert_eq!(sign, expected, "state {}", bits);
        }
    }

    #[test]
    fn marks_matching_states_with_even_free_count() {
        let oracle = build_evidence_oracle(3, &[0], &[true]).unwrap();
        assert_marks(&oracle, |b| b.starts_with('1'));
    }

    #[test]
    fn marks_matching_states_with_odd_free_count() {
        let oracle = build_evidence_oracle(3, &[0, 2], &[false, true]).unwrap();
        assert_marks(&oracle, |b| &b[0..1] == "0" && &b[2..3] == "1");
    }

    #[test]
    fn all_qubits_as_controls_marks_single_state() {
        let oracle = build_evidence_oracle(2, &[0, 1], &[true, false]).unwrap();
        assert_marks(&oracle, |b| b == "10");
    }

    #[test]
    fn empty_controls_flip_every_state() {
        let oracle = build_evidence_oracle(2, &[], &[]).unwrap();
        assert_marks(&oracle, |_| true);
        let oracle = build_evidence_oracle(3, &[], &[]).unwrap();
        assert_marks(&oracle, |_| true);
    }

    #[test]
    fn applying_twice_is_identity() {
        let mut prep = Circuit::new(3);
        prep.ry(0, 0.3).unwrap().ry(1, 1.1).unwrap().ry(2, 2.0).unwrap();
        let oracle = build_evidence_oracle(3, &[1], &[false]).unwrap();
        let twice = prep.compose(&oracle).unwrap().compose(&oracle).unwrap();
        let a = Statevector::from_circuit(&prep).unwrap();
        let b = Statevector::from_circuit(&twice).unwrap();
        assert!((a.fidelity(&b).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = build_evidence_oracle(2, &[0], &[]).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidCircuit(_)));
        assert!(build_evidence_oracle(2, &[0, 0], &[true, true]).is_err());
        assert!(build_evidence_oracle(2, &[5], &[true]).is_err());
    }

    #[test]
    fn named_evidence_maps_to_register_bits() {
        let layout = RegisterLayout::from_cardinalities([("A", 2), ("B", 4)]).unwrap();
        let oracle =
            build_oracle_for_evidence(&layout, &Assignment::from([("B", 2)])).unwrap();
        assert_marks(&oracle, |b| &b[1..3] == "10");

        let err = build_oracle_for_evidence(&layout, &Assignment::from([("Z", 0)])).unwrap_err();
        assert_eq!(err, InferenceError::UnknownVariable("Z".into()));
    }
}
