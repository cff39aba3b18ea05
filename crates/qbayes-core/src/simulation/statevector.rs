//! Dense statevector simulation.
//!
//! Qubit `k` of an `n`-qubit state corresponds to bit `n - 1 - k` of the basis
//! index, so formatting an index with [`super::bitstring`] yields the
//! documented qubit-0-first bitstring.
//!
//! ## Feature gating
//!
//! With the `parallel` feature, gate application and probability evaluation
//! run over rayon's thread pool. Results are identical to the sequential
//! path: every output amplitude is computed independently from the previous
//! state.

use num_complex::Complex64;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{bitstring, SampleCounts, SimulationBackend};
use crate::circuit::{Circuit, GateOp, Operation};
use crate::engine::errors::InferenceError;

/// Amplitudes below this squared magnitude are reported as zero probability.
const PROBABILITY_FLOOR: f64 = 1e-15;

/// Widest state this module will allocate (2^30 amplitudes, 16 GiB).
pub const MAX_QUBITS: usize = 30;

/// Configuration for [`StatevectorBackend`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatevectorConfig {
    /// Base seed. Run `i` of the backend uses `seed + i`. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Largest register the backend will allocate (2^max_qubits amplitudes).
    pub max_qubits: usize,
}

impl Default for StatevectorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_qubits: 24,
        }
    }
}

impl StatevectorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    fn validate(self) -> Result<Self, InferenceError> {
        if self.max_qubits == 0 || self.max_qubits > MAX_QUBITS {
            return Err(InferenceError::InvalidConfig(format!(
                "statevector: max_qubits must be in 1..={}, got {}",
                MAX_QUBITS, self.max_qubits
            )));
        }
        Ok(self)
    }
}

/// A pure state over `num_qubits` qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl Statevector {
    /// `|0…0⟩` over `num_qubits` qubits. Fails above [`MAX_QUBITS`].
    pub fn zero_state(num_qubits: usize) -> Result<Self, InferenceError> {
        if num_qubits > MAX_QUBITS {
            return Err(InferenceError::Simulation(format!(
                "{} qubits exceeds the statevector limit of {}",
                num_qubits, MAX_QUBITS
            )));
        }
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1usize << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// Builds a state from raw amplitudes; the length must be a power of two.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> Result<Self, InferenceError> {
        if amplitudes.is_empty() || !amplitudes.len().is_power_of_two() {
            return Err(InferenceError::Simulation(format!(
                "amplitude vector length {} is not a power of two",
                amplitudes.len()
            )));
        }
        let num_qubits = amplitudes.len().trailing_zeros() as usize;
        if num_qubits > MAX_QUBITS {
            return Err(InferenceError::Simulation(format!(
                "{} qubits exceeds the statevector limit of {}",
                num_qubits, MAX_QUBITS
            )));
        }
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// Runs every gate of `circuit` on `|0…0⟩`. Measurement is ignored.
    pub fn from_circuit(circuit: &Circuit) -> Result<Self, InferenceError> {
        let mut state = Self::zero_state(circuit.num_qubits())?;
        state.evolve(circuit)?;
        Ok(state)
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn amplitude(&self, bits: &str) -> Option<Complex64> {
        if bits.len() != self.num_qubits {
            return None;
        }
        usize::from_str_radix(bits, 2)
            .ok()
            .map(|i| self.amplitudes[i])
    }

    /// Applies every gate of `circuit`. Measurement is ignored.
    pub fn evolve(&mut self, circuit: &Circuit) -> Result<(), InferenceError> {
        if circuit.num_qubits() != self.num_qubits {
            return Err(InferenceError::Simulation(format!(
                "circuit has {} qubits, state has {}",
                circuit.num_qubits(),
                self.num_qubits
            )));
        }
        for op in circuit.ops() {
            if let Operation::Gate(g) = op {
                self.apply(g)?;
            }
        }
        Ok(())
    }

    /// Applies one (possibly controlled) single-qubit gate.
    ///
    /// Fails with `InvalidCircuit` if the target or a control is out of range,
    /// or a control coincides with the target.
    pub fn apply(&mut self, op: &GateOp) -> Result<(), InferenceError> {
        if op.target >= self.num_qubits {
            return Err(InferenceError::InvalidCircuit(format!(
                "target qubit {} out of range for {} qubits",
                op.target, self.num_qubits
            )));
        }
        if let Some(&c) = op
            .controls
            .iter()
            .find(|&&c| c >= self.num_qubits || c == op.target)
        {
            return Err(InferenceError::InvalidCircuit(format!(
                "control qubit {} invalid for target {} on {} qubits",
                c, op.target, self.num_qubits
            )));
        }
        let t_mask = self.mask(op.target);
        let c_mask = op
            .controls
            .iter()
            .fold(0usize, |acc, &c| acc | self.mask(c));
        let m = op.gate.matrix();
        let old = &self.amplitudes;

        let kernel = |i: usize| -> Complex64 {
            if i & c_mask != c_mask {
                return old[i];
            }
            let lo = old[i & !t_mask];
            let hi = old[i | t_mask];
            if i & t_mask == 0 {
                m[0][0] * lo + m[0][1] * hi
            } else {
                m[1][0] * lo + m[1][1] * hi
            }
        };

        #[cfg(feature = "parallel")]
        let next: Vec<Complex64> = (0..old.len()).into_par_iter().map(kernel).collect();
        #[cfg(not(feature = "parallel"))]
        let next: Vec<Complex64> = (0..old.len()).map(kernel).collect();

        self.amplitudes = next;
        Ok(())
    }

    /// Measurement probabilities indexed by basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        let probs = self.amplitudes.par_iter().map(|a| a.norm_sqr()).collect();
        #[cfg(not(feature = "parallel"))]
        let probs = self.amplitudes.iter().map(|a| a.norm_sqr()).collect();
        probs
    }

    /// Non-zero measurement probabilities keyed by bitstring.
    pub fn distribution(&self) -> BTreeMap<String, f64> {
        self.probabilities()
            .into_iter()
            .enumerate()
            .filter(|(_, p)| *p > PROBABILITY_FLOOR)
            .map(|(i, p)| (bitstring(i, self.num_qubits), p))
            .collect()
    }

    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    /// `|⟨self|other⟩|²`.
    pub fn fidelity(&self, other: &Statevector) -> Result<f64, InferenceError> {
        if other.num_qubits != self.num_qubits {
            return Err(InferenceError::Simulation(
                "fidelity requires states of equal size".into(),
            ));
        }
        let overlap: Complex64 = self
            .amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum();
        Ok(overlap.norm_sqr())
    }

    fn mask(&self, qubit: usize) -> usize {
        1usize << (self.num_qubits - 1 - qubit)
    }
}

/// Reference backend: exact statevector evolution followed by multinomial
/// sampling of the final distribution.
#[derive(Debug)]
pub struct StatevectorBackend {
    config: StatevectorConfig,
    runs: AtomicU64,
}

impl Default for StatevectorBackend {
    fn default() -> Self {
        Self {
            config: StatevectorConfig::default(),
            runs: AtomicU64::new(0),
        }
    }
}

impl StatevectorBackend {
    pub fn new(config: StatevectorConfig) -> Result<Self, InferenceError> {
        Ok(Self {
            config: config.validate()?,
            runs: AtomicU64::new(0),
        })
    }

    /// Backend with a fixed base seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            config: StatevectorConfig::default().with_seed(seed),
            runs: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &StatevectorConfig {
        &self.config
    }

    fn rng_for_next_run(&self) -> StdRng {
        let run = self.runs.fetch_add(1, Ordering::Relaxed);
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(run)),
            None => StdRng::from_entropy(),
        }
    }
}

impl SimulationBackend for StatevectorBackend {
    fn name(&self) -> &str {
        "statevector"
    }

    fn run(&self, circuit: &Circuit, shots: u64) -> Result<SampleCounts, InferenceError> {
        if shots == 0 {
            return Err(InferenceError::Simulation("shots must be > 0".into()));
        }
        if !circuit.is_measured() {
            return Err(InferenceError::Simulation(
                "circuit has no terminal measurement".into(),
            ));
        }
        let n = circuit.num_qubits();
        if n == 0 || n > self.config.max_qubits {
            return Err(InferenceError::Simulation(format!(
                "{} qubits outside supported range 1..={}",
                n, self.config.max_qubits
            )));
        }

        let state = Statevector::from_circuit(circuit)?;
        let probs = state.probabilities();
        let dist = WeightedIndex::new(&probs)
            .map_err(|e| InferenceError::Simulation(format!("cannot sample state: {}", e)))?;

        let mut rng = self.rng_for_next_run();
        let mut tally: FxHashMap<usize, u64> = FxHashMap::default();
        for _ in 0..shots {
            *tally.entry(dist.sample(&mut rng)).or_insert(0) += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            qubits = n,
            gates = circuit.len(),
            shots,
            outcomes = tally.len(),
            "statevector run complete"
        );

        Ok(tally
            .into_iter()
            .map(|(i, count)| (bitstring(i, n), count))
            .collect())
    }
}
