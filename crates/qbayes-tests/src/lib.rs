//! Shared fixtures for the qbayes integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use qbayes_core::circuit::Circuit;
use qbayes_core::{InferenceError, SampleCounts, SimulationBackend};
use qbayes_network::{Assignment, BayesianNetwork, Variable};

/// Backend that ignores the circuit and returns fixed counts.
#[derive(Debug, Clone)]
pub struct FixedCounts {
    counts: SampleCounts,
}

impl FixedCounts {
    pub fn new(counts: SampleCounts) -> Arc<Self> {
        Arc::new(Self { counts })
    }
}

impl SimulationBackend for FixedCounts {
    fn name(&self) -> &str {
        "fixed-counts"
    }

    fn run(&self, _circuit: &Circuit, _shots: u64) -> Result<SampleCounts, InferenceError> {
        Ok(self.counts.clone())
    }
}

/// Two independent fair coins `A` and `B`.
pub fn independent_coins() -> BayesianNetwork {
    BayesianNetwork::new(vec![
        Variable::root("A", vec![0.5, 0.5]),
        Variable::root("B", vec![0.5, 0.5]),
    ])
    .expect("valid network")
}

/// `A -> B -> C` where every child copies its parent; `A` is a fair coin.
pub fn copy_chain() -> BayesianNetwork {
    let copy = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    BayesianNetwork::new(vec![
        Variable::root("A", vec![0.5, 0.5]),
        Variable::new("B", 2, vec!["A".into()], copy.clone()),
        Variable::new("C", 2, vec!["B".into()], copy),
    ])
    .expect("valid network")
}

/// The classic cloudy / sprinkler / rain / wet-grass network.
pub fn sprinkler() -> BayesianNetwork {
    BayesianNetwork::new(vec![
        Variable::root("Cloudy", vec![0.5, 0.5]),
        Variable::new(
            "Sprinkler",
            2,
            vec!["Cloudy".into()],
            vec![vec![0.5, 0.5], vec![0.9, 0.1]],
        ),
        Variable::new(
            "Rain",
            2,
            vec!["Cloudy".into()],
            vec![vec![0.8, 0.2], vec![0.2, 0.8]],
        ),
        Variable::new(
            "WetGrass",
            2,
            vec!["Sprinkler".into(), "Rain".into()],
            vec![
                vec![1.0, 0.0],
                vec![0.1, 0.9],
                vec![0.1, 0.9],
                vec![0.01, 0.99],
            ],
        ),
    ])
    .expect("valid network")
}

/// Every full assignment of `network` in declaration-order mixed radix.
pub fn all_assignments(network: &BayesianNetwork) -> Vec<Assignment> {
    let vars = network.variables();
    let total: usize = vars.iter().map(Variable::cardinality).product();
    (0..total)
        .map(|mut idx| {
            let mut values = vec![0usize; vars.len()];
            for (slot, var) in values.iter_mut().zip(vars).rev() {
                *slot = idx % var.cardinality();
                idx /= var.cardinality();
            }
            vars.iter()
                .map(|v| v.name().to_string())
                .zip(values)
                .collect()
        })
        .collect()
}

/// Exact `P(query | evidence)` by enumeration.
pub fn exact_conditional(
    network: &BayesianNetwork,
    query: &Assignment,
    evidence: &Assignment,
) -> f64 {
    let agrees = |full: &Assignment, partial: &Assignment| {
        partial.iter().all(|(name, value)| full.get(name) == Some(value))
    };
    let mut joint_evidence = 0.0;
    let mut joint_both = 0.0;
    for full in all_assignments(network) {
        if !agrees(&full, evidence) {
            continue;
        }
        let p = network.joint_probability(&full).expect("full assignment");
        joint_evidence += p;
        if agrees(&full, query) {
            joint_both += p;
        }
    }
    joint_both / joint_evidence
}

/// Builds counts from `(bitstring, count)` pairs.
pub fn counts(pairs: &[(&str, u64)]) -> SampleCounts {
    pairs
        .iter()
        .map(|(bits, c)| (bits.to_string(), *c))
        .collect::<BTreeMap<_, _>>()
}
