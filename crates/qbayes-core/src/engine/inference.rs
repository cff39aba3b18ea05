//! # Inference engine
//!
//! Estimates `P(query | evidence)` by amplified rejection sampling:
//!
//! 1. **CircuitBuilt**: evidence oracle over the evidence registers, Grover
//!    iterate(s) around the state preparation, measurement of every qubit.
//! 2. **Simulated**: one backend call with the configured shot budget.
//! 3. **Filtered**: samples whose evidence segments disagree with the
//!    evidence are rejected.
//! 4. **Done**: the accepted samples are returned as [`RejectionSamples`].
//!
//! The engine holds no mutable sample state. Every call to
//! [`InferenceEngine::rejection_sampling`] returns a fresh result, and
//! [`InferenceEngine::inference`] either samples anew (when evidence is given)
//! or works on a result the caller threads in explicitly.

use std::sync::Arc;

use qbayes_network::{Assignment, BayesianNetwork};

use crate::circuit::Circuit;
use crate::engine::amplification::build_amplified_circuit;
use crate::engine::config::InferenceConfig;
use crate::engine::errors::InferenceError;
use crate::engine::oracle::build_oracle_for_evidence;
use crate::engine::registers::RegisterLayout;
use crate::engine::state_prep::build_state_preparation;
use crate::simulation::{SampleCounts, SimulationBackend};

/// Phases of one rejection-sampling call, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPhase {
    Idle,
    CircuitBuilt,
    Simulated,
    Filtered,
    Done,
}

/// A unitary circuit together with the layout that names its qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCircuit {
    circuit: Circuit,
    layout: RegisterLayout,
}

impl PreparedCircuit {
    pub fn new(circuit: Circuit, layout: RegisterLayout) -> Result<Self, InferenceError> {
        if circuit.num_qubits() != layout.num_qubits() {
            return Err(InferenceError::InvalidCircuit(format!(
                "circuit has {} qubits, layout covers {}",
                circuit.num_qubits(),
                layout.num_qubits()
            )));
        }
        if circuit.is_measured() {
            return Err(InferenceError::InvalidCircuit(
                "prepared circuit must not be measured".into(),
            ));
        }
        Ok(Self { circuit, layout })
    }

    /// Treats every qubit as a binary variable named by its index.
    pub fn per_qubit(circuit: Circuit) -> Result<Self, InferenceError> {
        let layout = RegisterLayout::per_qubit(circuit.num_qubits());
        Self::new(circuit, layout)
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }
}

/// What the engine prepares its base state from.
#[derive(Debug, Clone)]
pub enum EngineSource {
    /// State preparation is derived from the network's CPTs.
    Network(BayesianNetwork),
    /// A caller-built state preparation is used as is.
    Circuit(PreparedCircuit),
}

impl From<BayesianNetwork> for EngineSource {
    fn from(network: BayesianNetwork) -> Self {
        EngineSource::Network(network)
    }
}

impl From<PreparedCircuit> for EngineSource {
    fn from(prepared: PreparedCircuit) -> Self {
        EngineSource::Circuit(prepared)
    }
}

/// Evidence-consistent samples from one rejection-sampling call.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionSamples {
    samples: SampleCounts,
    total_valid: u64,
    total_shots: u64,
    evidence: Assignment,
    layout: Arc<RegisterLayout>,
}

impl RejectionSamples {
    /// Accepted bitstrings and their counts.
    pub fn samples(&self) -> &SampleCounts {
        &self.samples
    }

    /// Sum of accepted counts.
    pub fn total_valid(&self) -> u64 {
        self.total_valid
    }

    /// Shots simulated before filtering.
    pub fn total_shots(&self) -> u64 {
        self.total_shots
    }

    pub fn evidence(&self) -> &Assignment {
        &self.evidence
    }

    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    /// Fraction of shots that survived filtering.
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_shots == 0 {
            return 0.0;
        }
        self.total_valid as f64 / self.total_shots as f64
    }

    /// Fraction of accepted samples matching every entry of `query`.
    ///
    /// An empty query matches every sample and yields 1.0.
    pub fn probability(&self, query: &Assignment) -> Result<f64, InferenceError> {
        self.layout.check(query)?;
        if self.total_valid == 0 {
            return Err(InferenceError::NoValidSamples);
        }
        let mut hits = 0u64;
        for (bits, &count) in &self.samples {
            if self.layout.matches(bits, query)? {
                hits += count;
            }
        }
        Ok(hits as f64 / self.total_valid as f64)
    }

    /// Estimated conditional distribution over every value of `variable`.
    pub fn distribution(&self, variable: &str) -> Result<Vec<f64>, InferenceError> {
        let reg = self.layout.register(variable)?;
        if self.total_valid == 0 {
            return Err(InferenceError::NoValidSamples);
        }
        let mut counts = vec![0u64; reg.cardinality];
        for (bits, &count) in &self.samples {
            let value = self.layout.decode(bits, variable)?;
            match counts.get_mut(value) {
                Some(slot) => *slot += count,
                None => {
                    return Err(InferenceError::Internal(format!(
                        "accepted sample '{}' decodes '{}' to padding value {}",
                        bits, variable, value
                    )))
                }
            }
        }
        Ok(counts
            .into_iter()
            .map(|c| c as f64 / self.total_valid as f64)
            .collect())
    }

    /// Serializes the accepted samples for external inspection or plotting.
    ///
    /// The `registers` entry carries the layout needed to decode bitstrings.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, InferenceError> {
        let registers: Vec<_> = self.layout.iter().collect();
        let value = serde_json::json!({
            "registers": registers,
            "evidence": self.evidence,
            "total_shots": self.total_shots,
            "total_valid": self.total_valid,
            "samples": self.samples,
        });
        serde_json::to_string_pretty(&value)
            .map_err(|e| InferenceError::Internal(format!("Failed to serialize samples: {}", e)))
    }
}

/// Amplified rejection-sampling engine over one prepared state.
pub struct InferenceEngine {
    network: Option<BayesianNetwork>,
    layout: Arc<RegisterLayout>,
    state_prep: Circuit,
    backend: Arc<dyn SimulationBackend>,
    config: InferenceConfig,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("backend", &self.backend.name())
            .field("num_qubits", &self.layout.num_qubits())
            .field("state_prep_ops", &self.state_prep.len())
            .field("config", &self.config)
            .finish()
    }
}

impl InferenceEngine {
    /// Builds the engine and its base state-preparation circuit.
    pub fn new(
        source: impl Into<EngineSource>,
        backend: Arc<dyn SimulationBackend>,
        config: InferenceConfig,
    ) -> Result<Self, InferenceError> {
        let config = config.validate()?;
        let (network, layout, state_prep) = match source.into() {
            EngineSource::Network(network) => {
                if network.is_empty() {
                    return Err(InferenceError::InvalidNetwork(
                        "network has no variables".into(),
                    ));
                }
                let layout = RegisterLayout::allocate(&network)?;
                let state_prep =
                    build_state_preparation(&network, &layout, config.normalization_tolerance)?;
                (Some(network), layout, state_prep)
            }
            EngineSource::Circuit(prepared) => {
                if prepared.layout.num_qubits() == 0 {
                    return Err(InferenceError::InvalidCircuit(
                        "prepared circuit has no qubits".into(),
                    ));
                }
                (None, prepared.layout, prepared.circuit)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            backend = backend.name(),
            variables = layout.len(),
            qubits = layout.num_qubits(),
            state_prep_ops = state_prep.len(),
            "inference engine ready"
        );

        Ok(Self {
            network,
            layout: Arc::new(layout),
            state_prep,
            backend,
            config,
        })
    }

    /// Engine over `network` with the default configuration.
    pub fn from_network(
        network: BayesianNetwork,
        backend: Arc<dyn SimulationBackend>,
    ) -> Result<Self, InferenceError> {
        Self::new(network, backend, InferenceConfig::default())
    }

    pub fn network(&self) -> Option<&BayesianNetwork> {
        self.network.as_ref()
    }

    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    /// The unmeasured base state-preparation circuit.
    pub fn state_preparation(&self) -> &Circuit {
        &self.state_prep
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// The measured circuit that rejection sampling runs for `evidence`.
    pub fn sampling_circuit(&self, evidence: &Assignment) -> Result<Circuit, InferenceError> {
        let oracle = build_oracle_for_evidence(&self.layout, evidence)?;
        let mut circuit =
            build_amplified_circuit(&self.state_prep, &oracle, self.config.grover_iterations)?;
        circuit.measure_all()?;
        Ok(circuit)
    }

    /// Samples the amplified circuit and keeps evidence-consistent outcomes.
    ///
    /// Zero accepted samples is not an error here; probability queries on the
    /// result fail with [`InferenceError::NoValidSamples`].
    pub fn rejection_sampling(
        &self,
        evidence: &Assignment,
    ) -> Result<RejectionSamples, InferenceError> {
        self.trace_phase(SamplingPhase::Idle, evidence);
        let circuit = self.sampling_circuit(evidence)?;
        self.trace_phase(SamplingPhase::CircuitBuilt, evidence);

        let counts = self.backend.run(&circuit, self.config.shots)?;
        self.trace_phase(SamplingPhase::Simulated, evidence);

        let mut samples = SampleCounts::new();
        let mut total_valid = 0u64;
        let mut total_shots = 0u64;
        for (bits, count) in counts {
            total_shots += count;
            if self.layout.matches(&bits, evidence)? {
                total_valid += count;
                samples.insert(bits, count);
            }
        }
        self.trace_phase(SamplingPhase::Filtered, evidence);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            total_shots,
            total_valid,
            distinct = samples.len(),
            "rejection sampling filtered"
        );

        let result = RejectionSamples {
            samples,
            total_valid,
            total_shots,
            evidence: evidence.clone(),
            layout: Arc::clone(&self.layout),
        };
        self.trace_phase(SamplingPhase::Done, evidence);
        Ok(result)
    }

    /// Estimates `P(query | evidence)`.
    ///
    /// With `evidence` present (an empty assignment counts) a fresh
    /// rejection-sampling run is performed and `previous` is ignored. Without
    /// evidence the ratio is computed over `previous`; if that is absent too
    /// the call fails with [`InferenceError::StaleState`].
    ///
    /// The fixed iterate count is tuned for rare evidence. When
    /// `P(evidence)` exceeds 1/2, acceptance after one iterate is
    /// `sin²(3·asin √p)`, which falls below `p` and reaches zero at `p = 3/4`,
    /// so the call can fail with [`InferenceError::NoValidSamples`] for
    /// perfectly possible evidence. Configure `grover_iterations = 0` for
    /// such queries.
    pub fn inference(
        &self,
        query: &Assignment,
        evidence: Option<&Assignment>,
        previous: Option<&RejectionSamples>,
    ) -> Result<f64, InferenceError> {
        self.layout.check(query)?;
        match (evidence, previous) {
            (Some(evidence), _) => self.rejection_sampling(evidence)?.probability(query),
            (None, Some(samples)) => samples.probability(query),
            (None, None) => Err(InferenceError::StaleState),
        }
    }

    /// Samples the base state with no evidence and no amplification.
    pub fn simulate(&self) -> Result<SampleCounts, InferenceError> {
        let mut circuit = self.state_prep.clone();
        circuit.measure_all()?;
        self.backend.run(&circuit, self.config.shots)
    }

    #[allow(unused_variables)]
    fn trace_phase(&self, phase: SamplingPhase, evidence: &Assignment) {
        #[cfg(feature = "tracing")]
        tracing::trace!(?phase, evidence = ?evidence, "rejection sampling");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::StatevectorBackend;
    use qbayes_network::Variable;
    use std::sync::Mutex;

    /// Returns canned counts and records what it was asked to run.
    struct FixedCounts {
        counts: SampleCounts,
        shots_seen: Mutex<Vec<u64>>,
    }

    impl FixedCounts {
        fn new(pairs: &[(&str, u64)]) -> Arc<Self> {
            Arc::new(Self {
                counts: pairs.iter().map(|(b, c)| (b.to_string(), *c)).collect(),
                shots_seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl SimulationBackend for FixedCounts {
        fn name(&self) -> &str {
            "fixed"
        }

        fn run(&self, _circuit: &Circuit, shots: u64) -> Result<SampleCounts, InferenceError> {
            self.shots_seen.lock().unwrap().push(shots);
            Ok(self.counts.clone())
        }
    }

    fn two_coins() -> BayesianNetwork {
        BayesianNetwork::new(vec![
            Variable::root("A", vec![0.5, 0.5]),
            Variable::root("B", vec![0.5, 0.5]),
        ])
        .unwrap()
    }

    #[test]
    fn filtering_keeps_only_evidence_consistent_samples() {
        let backend = FixedCounts::new(&[("00", 10), ("01", 30), ("10", 25), ("11", 35)]);
        let engine = InferenceEngine::from_network(two_coins(), backend.clone()).unwrap();
        let result = engine
            .rejection_sampling(&Assignment::from([("A", 0)]))
            .unwrap();

        assert_eq!(result.total_valid(), 40);
        assert_eq!(result.total_shots(), 100);
        assert_eq!(result.samples().len(), 2);
        assert!((result.probability(&Assignment::from([("B", 1)])).unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(*backend.shots_seen.lock().unwrap(), vec![10_000]);
    }

    #[test]
    fn empty_evidence_accepts_everything() {
        let backend = FixedCounts::new(&[("00", 10), ("11", 5)]);
        let engine = InferenceEngine::from_network(two_coins(), backend).unwrap();
        let result = engine.rejection_sampling(&Assignment::new()).unwrap();
        assert_eq!(result.total_valid(), 15);
        assert_eq!(result.acceptance_rate(), 1.0);
    }

    #[test]
    fn inference_without_evidence_or_samples_is_stale() {
        let engine =
            InferenceEngine::from_network(two_coins(), FixedCounts::new(&[("00", 1)])).unwrap();
        let err = engine
            .inference(&Assignment::from([("A", 0)]), None, None)
            .unwrap_err();
        assert_eq!(err, InferenceError::StaleState);
    }

    #[test]
    fn inference_reuses_threaded_samples() {
        let engine = InferenceEngine::from_network(
            two_coins(),
            FixedCounts::new(&[("10", 1), ("11", 3)]),
        )
        .unwrap();
        let samples = engine
            .rejection_sampling(&Assignment::from([("A", 1)]))
            .unwrap();
        let p = engine
            .inference(&Assignment::from([("B", 1)]), None, Some(&samples))
            .unwrap();
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn no_surviving_samples_fails_on_probability() {
        let engine =
            InferenceEngine::from_network(two_coins(), FixedCounts::new(&[("00", 50)])).unwrap();
        let result = engine
            .rejection_sampling(&Assignment::from([("A", 1)]))
            .unwrap();
        assert_eq!(result.total_valid(), 0);
        assert_eq!(
            result.probability(&Assignment::new()),
            Err(InferenceError::NoValidSamples)
        );
    }

    #[test]
    fn unknown_evidence_variable_is_rejected() {
        let engine =
            InferenceEngine::from_network(two_coins(), FixedCounts::new(&[("00", 1)])).unwrap();
        let err = engine
            .rejection_sampling(&Assignment::from([("Z", 0)]))
            .unwrap_err();
        assert_eq!(err, InferenceError::UnknownVariable("Z".into()));
    }

    #[test]
    fn out_of_range_query_is_rejected() {
        let engine =
            InferenceEngine::from_network(two_coins(), FixedCounts::new(&[("00", 1)])).unwrap();
        let err = engine
            .inference(&Assignment::from([("A", 2)]), Some(&Assignment::new()), None)
            .unwrap_err();
        assert!(matches!(err, InferenceError::ValueOutOfRange { .. }));
    }

    #[test]
    fn distribution_covers_every_value() {
        let net = BayesianNetwork::new(vec![Variable::root("A", vec![0.2, 0.3, 0.5])]).unwrap();
        let engine =
            InferenceEngine::from_network(net, FixedCounts::new(&[("00", 2), ("01", 3), ("10", 5)]))
                .unwrap();
        let result = engine.rejection_sampling(&Assignment::new()).unwrap();
        let dist = result.distribution("A").unwrap();
        assert_eq!(dist, vec![0.2, 0.3, 0.5]);
    }

    #[test]
    fn circuit_source_uses_qubit_index_names() {
        let mut prep = Circuit::new(2);
        prep.h(0).unwrap().mcx(&[0], 1).unwrap();
        let prepared = PreparedCircuit::per_qubit(prep).unwrap();
        let engine = InferenceEngine::new(
            prepared,
            Arc::new(StatevectorBackend::seeded(11)),
            InferenceConfig::default().with_shots(2_000),
        )
        .unwrap();
        assert!(engine.network().is_none());
        let p = engine
            .inference(
                &Assignment::from([("1", 1)]),
                Some(&Assignment::from([("0", 1)])),
                None,
            )
            .unwrap();
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sampling_circuit_is_measured_and_amplified() {
        let engine = InferenceEngine::from_network(
            two_coins(),
            Arc::new(StatevectorBackend::seeded(3)),
        )
        .unwrap();
        let circuit = engine
            .sampling_circuit(&Assignment::from([("A", 0)]))
            .unwrap();
        assert!(circuit.is_measured());
        assert!(circuit.len() > engine.state_preparation().len());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_export_carries_samples_and_layout() {
        let engine = InferenceEngine::from_network(
            two_coins(),
            FixedCounts::new(&[("00", 4), ("01", 6), ("10", 9)]),
        )
        .unwrap();
        let result = engine
            .rejection_sampling(&Assignment::from([("A", 0)]))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert_eq!(parsed["total_valid"], 10);
        assert_eq!(parsed["total_shots"], 19);
        assert_eq!(parsed["evidence"], serde_json::json!({ "A": 0 }));
        let keys: Vec<&str> = parsed["samples"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["00", "01"]);
        assert_eq!(parsed["registers"][1]["name"], "B");
        assert_eq!(parsed["registers"][1]["start"], 1);
    }

    #[test]
    fn empty_network_is_rejected() {
        let net = BayesianNetwork::new(vec![]).unwrap();
        let err =
            InferenceEngine::from_network(net, Arc::new(StatevectorBackend::seeded(0))).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidNetwork(_)));
    }
}
