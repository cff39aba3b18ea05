//! Property tests for register widths, filtering, state preparation and the evidence oracle

use qbayes_core::engine::oracle::build_evidence_oracle;
use qbayes_core::engine::registers::{register_width, RegisterLayout};
use qbayes_core::simulation::bitstring;
use qbayes_core::{
    Assignment, BayesianNetwork, Circuit, InferenceEngine, Statevector, Variable,
};
use qbayes_tests::{counts, independent_coins, FixedCounts};
use proptest::prelude::*;

fn uniform(num_qubits: usize) -> Circuit {
    let mut circuit = Circuit::new(num_qubits);
    for q in 0..num_qubits {
        circuit.h(q).unwrap();
    }
    circuit
}

/// `(num_qubits, controls, expected bits)` with distinct in-range controls.
fn oracle_case() -> impl Strategy<Value = (usize, Vec<usize>, Vec<bool>)> {
    (1usize..=5).prop_flat_map(|n| {
        (
            Just(n),
            proptest::sample::subsequence((0..n).collect::<Vec<_>>(), 0..=n),
            proptest::collection::vec(any::<bool>(), n),
        )
            .prop_map(|(n, controls, bits)| {
                let values = bits[..controls.len()].to_vec();
                (n, controls, values)
            })
    })
}

proptest! {
    #[test]
    fn register_width_is_tight(c in 2usize..5_000) {
        let w = register_width(c).unwrap();
        prop_assert!(c <= 1usize << w);
        prop_assert!(1usize << (w - 1) < c);
    }

    #[test]
    fn layout_covers_every_qubit_once(cards in proptest::collection::vec(2usize..20, 1..6)) {
        let layout = RegisterLayout::from_cardinalities(
            cards.iter().enumerate().map(|(i, &c)| (format!("V{}", i), c)),
        ).unwrap();
        let mut next = 0;
        for reg in layout.iter() {
            prop_assert_eq!(reg.start, next);
            prop_assert_eq!(reg.width, register_width(reg.cardinality).unwrap());
            next += reg.width;
        }
        prop_assert_eq!(layout.num_qubits(), next);
    }

    #[test]
    fn filtering_never_creates_samples(
        c00 in 0u64..500, c01 in 0u64..500, c10 in 0u64..500, c11 in 1u64..500,
        a in proptest::option::of(0usize..2), b in proptest::option::of(0usize..2),
    ) {
        let backend = FixedCounts::new(counts(&[("00", c00), ("01", c01), ("10", c10), ("11", c11)]));
        let engine = InferenceEngine::from_network(independent_coins(), backend).unwrap();
        let mut evidence = Assignment::new();
        if let Some(a) = a {
            evidence.insert("A", a);
        }
        if let Some(b) = b {
            evidence.insert("B", b);
        }
        let result = engine.rejection_sampling(&evidence).unwrap();
        let total = c00 + c01 + c10 + c11;
        prop_assert_eq!(result.total_shots(), total);
        prop_assert!(result.total_valid() <= total);
        prop_assert_eq!(result.samples().values().sum::<u64>(), result.total_valid());
        if evidence.is_empty() {
            prop_assert_eq!(result.total_valid(), total);
        }
    }

    #[test]
    fn root_distribution_is_loaded_exactly(
        weights in proptest::collection::vec(0.01f64..1.0, 2..7),
    ) {
        let sum: f64 = weights.iter().sum();
        let dist: Vec<f64> = weights.iter().map(|w| w / sum).collect();
        let network = BayesianNetwork::new(vec![Variable::root("X", dist.clone())]).unwrap();
        let engine = InferenceEngine::from_network(network, FixedCounts::new(counts(&[]))).unwrap();

        let state = Statevector::from_circuit(engine.state_preparation()).unwrap();
        let width = engine.layout().num_qubits();
        for (index, p) in state.probabilities().into_iter().enumerate() {
            let value = engine.layout().decode(&bitstring(index, width), "X").unwrap();
            let expected = dist.get(value).copied().unwrap_or(0.0);
            prop_assert!((p - expected).abs() < 1e-9, "value {}: {} vs {}", value, p, expected);
        }
    }

    #[test]
    fn oracle_flips_exactly_the_matching_states((n, controls, values) in oracle_case()) {
        let mut circuit = uniform(n);
        circuit.append(&build_evidence_oracle(n, &controls, &values).unwrap()).unwrap();
        let state = Statevector::from_circuit(&circuit).unwrap();
        let magnitude = (1.0 / (1usize << n) as f64).sqrt();

        for (index, amp) in state.amplitudes().iter().enumerate() {
            let bits: Vec<char> = bitstring(index, n).chars().collect();
            let matches = controls
                .iter()
                .zip(&values)
                .all(|(&q, &v)| (bits[q] == '1') == v);
            let expected = if matches { -magnitude } else { magnitude };
            prop_assert!((amp.re - expected).abs() < 1e-9, "index {}: {} vs {}", index, amp.re, expected);
            prop_assert!(amp.im.abs() < 1e-9);
        }
    }

    #[test]
    fn oracle_is_an_involution((n, controls, values) in oracle_case()) {
        let oracle = build_evidence_oracle(n, &controls, &values).unwrap();
        let mut circuit = Circuit::new(n);
        for q in 0..n {
            circuit.ry(q, 0.3 + q as f64).unwrap();
        }
        let reference = Statevector::from_circuit(&circuit).unwrap();
        circuit.append(&oracle).unwrap().append(&oracle).unwrap();
        let twice = Statevector::from_circuit(&circuit).unwrap();
        for (a, b) in reference.amplitudes().iter().zip(twice.amplitudes()) {
            prop_assert!((a - b).norm() < 1e-9);
        }
    }
}
