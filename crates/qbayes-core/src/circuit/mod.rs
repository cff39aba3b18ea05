//! # Gate-level circuits
//!
//! A [`Circuit`] is an ordered list of [`Operation`]s over a fixed number of
//! qubits. Gates act on one target qubit and may carry any number of controls;
//! a control fires when its qubit is `1`. Controls on `0` are expressed with an
//! X sandwich (see [`Circuit::controlled_on`]).
//!
//! Circuits compose by concatenation. [`Circuit::append_mapped`] translates the
//! appended circuit's qubit indices through a map, so a circuit built over a
//! subset of registers can be placed into a wider one.
//!
//! A circuit that ends in [`Operation::MeasureAll`] is terminal: nothing can be
//! appended after the measurement and it has no inverse.

use num_complex::Complex64;
use smallvec::SmallVec;
use std::collections::BTreeSet;

use crate::engine::errors::InferenceError;

/// Single-qubit gates used by state preparation, oracles, and reflections.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Gate {
    X,
    H,
    Z,
    /// Rotation about Y: `Ry(θ)|0⟩ = cos(θ/2)|0⟩ + sin(θ/2)|1⟩`.
    Ry(f64),
}

impl Gate {
    pub fn inverse(self) -> Gate {
        match self {
            Gate::X | Gate::H | Gate::Z => self,
            Gate::Ry(theta) => Gate::Ry(-theta),
        }
    }

    /// Row-major 2x2 unitary.
    pub fn matrix(self) -> [[Complex64; 2]; 2] {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        match self {
            Gate::X => [[zero, one], [one, zero]],
            Gate::H => {
                let s = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
                [[s, s], [s, -s]]
            }
            Gate::Z => [[one, zero], [zero, -one]],
            Gate::Ry(theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new((theta / 2.0).sin(), 0.0);
                [[c, -s], [s, c]]
            }
        }
    }
}

/// A gate applied to `target`, conditioned on every qubit in `controls` being `1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateOp {
    pub gate: Gate,
    pub target: usize,
    pub controls: SmallVec<[usize; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    Gate(GateOp),
    /// Measure every qubit in the computational basis. Always last.
    MeasureAll,
}

/// Ordered sequence of operations over `num_qubits` qubits.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circuit {
    num_qubits: usize,
    ops: Vec<Operation>,
}

impl Circuit {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            ops: Vec::new(),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates the gate operations, skipping measurement.
    pub fn gates(&self) -> impl Iterator<Item = &GateOp> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Operation::Gate(g) => Some(g),
            Operation::MeasureAll => None,
        })
    }

    pub fn is_measured(&self) -> bool {
        matches!(self.ops.last(), Some(Operation::MeasureAll))
    }

    /// Appends `gate` on `target` controlled by `controls` (all on `1`).
    pub fn apply(
        &mut self,
        gate: Gate,
        target: usize,
        controls: &[usize],
    ) -> Result<&mut Self, InferenceError> {
        self.ensure_open()?;
        self.check_qubit(target)?;
        let mut seen = BTreeSet::new();
        for &c in controls {
            self.check_qubit(c)?;
            if c == target {
                return Err(InferenceError::InvalidCircuit(format!(
                    "qubit {} is both control and target",
                    c
                )));
            }
            if !seen.insert(c) {
                return Err(InferenceError::InvalidCircuit(format!(
                    "control qubit {} listed twice",
                    c
                )));
            }
        }
        if let Gate::Ry(theta) = gate {
            if !theta.is_finite() {
                return Err(InferenceError::InvalidCircuit(format!(
                    "rotation angle must be finite, got {}",
                    theta
                )));
            }
        }
        self.ops.push(Operation::Gate(GateOp {
            gate,
            target,
            controls: SmallVec::from_slice(controls),
        }));
        Ok(self)
    }

    pub fn x(&mut self, target: usize) -> Result<&mut Self, InferenceError> {
        self.apply(Gate::X, target, &[])
    }

    pub fn h(&mut self, target: usize) -> Result<&mut Self, InferenceError> {
        self.apply(Gate::H, target, &[])
    }

    pub fn z(&mut self, target: usize) -> Result<&mut Self, InferenceError> {
        self.apply(Gate::Z, target, &[])
    }

    pub fn ry(&mut self, target: usize, theta: f64) -> Result<&mut Self, InferenceError> {
        self.apply(Gate::Ry(theta), target, &[])
    }

    /// Multi-controlled X (Toffoli generalisation).
    pub fn mcx(&mut self, controls: &[usize], target: usize) -> Result<&mut Self, InferenceError> {
        self.apply(Gate::X, target, controls)
    }

    /// Multi-controlled Z, written as `H · MCX · H` on the target.
    pub fn mcz(&mut self, controls: &[usize], target: usize) -> Result<&mut Self, InferenceError> {
        self.h(target)?;
        self.mcx(controls, target)?;
        self.h(target)
    }

    /// Appends `gate` controlled on each `(qubit, value)` pair.
    ///
    /// Controls expecting `false` are wrapped in X gates before and after.
    pub fn controlled_on(
        &mut self,
        gate: Gate,
        target: usize,
        controls: &[(usize, bool)],
    ) -> Result<&mut Self, InferenceError> {
        let flipped: SmallVec<[usize; 4]> = controls
            .iter()
            .filter(|(_, on)| !on)
            .map(|(q, _)| *q)
            .collect();
        let qubits: SmallVec<[usize; 8]> = controls.iter().map(|(q, _)| *q).collect();

        for &q in &flipped {
            self.x(q)?;
        }
        self.apply(gate, target, &qubits)?;
        for &q in &flipped {
            self.x(q)?;
        }
        Ok(self)
    }

    /// Terminates the circuit with a measurement of every qubit.
    pub fn measure_all(&mut self) -> Result<&mut Self, InferenceError> {
        self.ensure_open()?;
        self.ops.push(Operation::MeasureAll);
        Ok(self)
    }

    /// Appends `other` with qubit `i` of `other` placed on qubit `i` of `self`.
    pub fn append(&mut self, other: &Circuit) -> Result<&mut Self, InferenceError> {
        let identity: Vec<usize> = (0..other.num_qubits).collect();
        self.append_mapped(other, &identity)
    }

    /// Appends `other` with qubit `i` of `other` placed on `qubit_map[i]`.
    pub fn append_mapped(
        &mut self,
        other: &Circuit,
        qubit_map: &[usize],
    ) -> Result<&mut Self, InferenceError> {
        if qubit_map.len() != other.num_qubits {
            return Err(InferenceError::InvalidCircuit(format!(
                "qubit map has {} entries for a {}-qubit circuit",
                qubit_map.len(),
                other.num_qubits
            )));
        }
        let distinct: BTreeSet<usize> = qubit_map.iter().copied().collect();
        if distinct.len() != qubit_map.len() {
            return Err(InferenceError::InvalidCircuit(
                "qubit map must be injective".into(),
            ));
        }
        for op in &other.ops {
            match op {
                Operation::Gate(g) => {
                    let controls: SmallVec<[usize; 4]> =
                        g.controls.iter().map(|&c| qubit_map[c]).collect();
                    self.apply(g.gate, qubit_map[g.target], &controls)?;
                }
                Operation::MeasureAll => {
                    if other.num_qubits != self.num_qubits {
                        return Err(InferenceError::InvalidCircuit(
                            "cannot append a partial measurement".into(),
                        ));
                    }
                    self.measure_all()?;
                }
            }
        }
        Ok(self)
    }

    /// `self` followed by `other`, as a new circuit.
    pub fn compose(&self, other: &Circuit) -> Result<Circuit, InferenceError> {
        let mut out = self.clone();
        out.append(other)?;
        Ok(out)
    }

    /// The adjoint: operations reversed, each gate inverted.
    pub fn inverse(&self) -> Result<Circuit, InferenceError> {
        let mut ops = Vec::with_capacity(self.ops.len());
        for op in self.ops.iter().rev() {
            match op {
                Operation::Gate(g) => ops.push(Operation::Gate(GateOp {
                    gate: g.gate.inverse(),
                    target: g.target,
                    controls: g.controls.clone(),
                })),
                Operation::MeasureAll => {
                    return Err(InferenceError::InvalidCircuit(
                        "measured circuit has no inverse".into(),
                    ))
                }
            }
        }
        Ok(Circuit {
            num_qubits: self.num_qubits,
            ops,
        })
    }

    fn check_qubit(&self, q: usize) -> Result<(), InferenceError> {
        if q >= self.num_qubits {
            return Err(InferenceError::InvalidCircuit(format!(
                "qubit {} out of range for {}-qubit circuit",
                q, self.num_qubits
            )));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), InferenceError> {
        if self.is_measured() {
            return Err(InferenceError::InvalidCircuit(
                "circuit is already measured".into(),
            ));
        }
        Ok(())
    }
}
