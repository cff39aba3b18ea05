//! Qubit register allocation for network variables.
//!
//! Each variable of cardinality `c` receives `ceil(log2(c))` contiguous qubits
//! (at least one). Registers are laid out in declaration order and tile
//! `0..num_qubits` exactly once. Within a register the lowest qubit index
//! carries the value's most significant bit, so a variable's segment of a
//! bitstring reads as its value in binary.

use rustc_hash::FxHashMap;

use qbayes_network::{Assignment, BayesianNetwork};

use crate::engine::errors::InferenceError;

/// Qubit range owned by one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableRegister {
    pub name: String,
    pub start: usize,
    pub width: usize,
    pub cardinality: usize,
}

impl VariableRegister {
    pub fn qubits(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.width
    }

    /// `(qubit, bit)` pairs spelling `value`, most significant bit first.
    pub fn bits_of(&self, value: usize) -> Vec<(usize, bool)> {
        (0..self.width)
            .map(|j| {
                let shift = self.width - 1 - j;
                (self.start + j, (value >> shift) & 1 == 1)
            })
            .collect()
    }
}

/// Number of qubits needed to enumerate `cardinality` states.
///
/// Cardinalities below 2 have no register and are rejected.
pub fn register_width(cardinality: usize) -> Result<usize, InferenceError> {
    if cardinality < 2 {
        return Err(InferenceError::InvalidNetwork(format!(
            "cardinality {} has no register; at least 2 is required",
            cardinality
        )));
    }
    // ceil(log2(c))
    Ok((usize::BITS - (cardinality - 1).leading_zeros()) as usize)
}

/// Deterministic variable -> qubit range mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterLayout {
    registers: Vec<VariableRegister>,
    by_name: FxHashMap<String, usize>,
    num_qubits: usize,
}

impl RegisterLayout {
    /// Allocates registers for every variable of `network`, in declaration order.
    pub fn allocate(network: &BayesianNetwork) -> Result<Self, InferenceError> {
        Self::from_cardinalities(
            network
                .variables()
                .iter()
                .map(|v| (v.name().to_string(), v.cardinality())),
        )
    }

    /// Allocates registers for `(name, cardinality)` pairs in the given order.
    pub fn from_cardinalities<I, S>(variables: I) -> Result<Self, InferenceError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut registers = Vec::new();
        let mut by_name = FxHashMap::default();
        let mut next = 0usize;
        for (name, cardinality) in variables {
            let name = name.into();
            if cardinality < 2 {
                return Err(InferenceError::InvalidNetwork(format!(
                    "variable '{}' has cardinality {}; at least 2 is required",
                    name, cardinality
                )));
            }
            if by_name.contains_key(&name) {
                return Err(InferenceError::InvalidNetwork(format!(
                    "duplicate variable '{}'",
                    name
                )));
            }
            let width = register_width(cardinality)?;
            by_name.insert(name.clone(), registers.len());
            registers.push(VariableRegister {
                name,
                start: next,
                width,
                cardinality,
            });
            next += width;
        }
        Ok(Self {
            registers,
            by_name,
            num_qubits: next,
        })
    }

    /// One binary variable per qubit, named by its index (`"0"`, `"1"`, ...).
    pub fn per_qubit(num_qubits: usize) -> Self {
        let registers: Vec<VariableRegister> = (0..num_qubits)
            .map(|q| VariableRegister {
                name: q.to_string(),
                start: q,
                width: 1,
                cardinality: 2,
            })
            .collect();
        let by_name = registers
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self {
            registers,
            by_name,
            num_qubits,
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableRegister> + '_ {
        self.registers.iter()
    }

    pub fn register(&self, name: &str) -> Result<&VariableRegister, InferenceError> {
        self.by_name
            .get(name)
            .map(|&i| &self.registers[i])
            .ok_or_else(|| InferenceError::UnknownVariable(name.to_string()))
    }

    /// Checks every variable exists and every value is below its cardinality.
    pub fn check(&self, assignment: &Assignment) -> Result<(), InferenceError> {
        for (name, value) in assignment.iter() {
            let reg = self.register(name)?;
            if value >= reg.cardinality {
                return Err(InferenceError::ValueOutOfRange {
                    variable: name.to_string(),
                    value,
                    cardinality: reg.cardinality,
                });
            }
        }
        Ok(())
    }

    /// Decodes the value held in `name`'s segment of `bits`.
    pub fn decode(&self, bits: &str, name: &str) -> Result<usize, InferenceError> {
        let reg = self.register(name)?;
        segment_value(bits, reg, self.num_qubits)
    }

    /// `(qubit, bit)` pairs an assignment pins down, in name order.
    pub fn encode(&self, assignment: &Assignment) -> Result<Vec<(usize, bool)>, InferenceError> {
        self.check(assignment)?;
        let mut out = Vec::new();
        for (name, value) in assignment.iter() {
            out.extend(self.register(name)?.bits_of(value));
        }
        Ok(out)
    }

    /// Whether every variable of `assignment` decodes to its asserted value.
    ///
    /// An empty assignment matches every bitstring.
    pub fn matches(&self, bits: &str, assignment: &Assignment) -> Result<bool, InferenceError> {
        for (name, value) in assignment.iter() {
            if self.decode(bits, name)? != value {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Splits a bitstring into a full named assignment.
    pub fn decode_all(&self, bits: &str) -> Result<Assignment, InferenceError> {
        self.registers
            .iter()
            .map(|reg| Ok((reg.name.clone(), segment_value(bits, reg, self.num_qubits)?)))
            .collect()
    }
}

fn segment_value(bits: &str, reg: &VariableRegister, num_qubits: usize) -> Result<usize, InferenceError> {
    if bits.len() != num_qubits {
        return Err(InferenceError::Simulation(format!(
            "bitstring '{}' has {} bits, layout has {} qubits",
            bits,
            bits.len(),
            num_qubits
        )));
    }
    let segment = &bits.as_bytes()[reg.qubits()];
    segment.iter().try_fold(0usize, |acc, b| match b {
        b'0' => Ok(acc << 1),
        b'1' => Ok((acc << 1) | 1),
        other => Err(InferenceError::Simulation(format!(
            "bitstring contains non-binary character '{}'",
            *other as char
        ))),
    })
}
