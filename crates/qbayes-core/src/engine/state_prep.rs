//! State preparation for a Bayesian network.
//!
//! Produces a circuit `A` with `A|0…0⟩ = Σ_x sqrt(P(x)) |x⟩`, where `P` is the
//! network's joint distribution. Variables are loaded in topological order.
//! For every CPT row the row's distribution is written into the variable's
//! register by a binary tree of `Ry` rotations, each controlled on:
//!
//! - the parent registers holding the row's parent values, and
//! - the register bits already fixed higher up the tree.
//!
//! The rotation on a tree node splits the node's probability mass between
//! its lower half (bit `0`) and upper half (bit `1`). Values at or above the
//! cardinality are padding: they carry zero mass, so they never receive
//! amplitude. Nodes without mass and rotations by zero are skipped.

use qbayes_network::{BayesianNetwork, Variable};

use crate::circuit::{Circuit, Gate};
use crate::engine::errors::InferenceError;
use crate::engine::registers::{RegisterLayout, VariableRegister};

/// Probability mass below which a tree node is treated as empty.
const MASS_EPSILON: f64 = 1e-12;

/// Builds the state-preparation circuit for `network` over `layout`.
pub fn build_state_preparation(
    network: &BayesianNetwork,
    layout: &RegisterLayout,
    tolerance: f64,
) -> Result<Circuit, InferenceError> {
    let mut circuit = Circuit::new(layout.num_qubits());

    for var in network.topological_order() {
        let reg = layout.register(var.name())?;
        if reg.cardinality != var.cardinality() {
            return Err(InferenceError::InvalidNetwork(format!(
                "register for '{}' sized for cardinality {}, variable has {}",
                var.name(),
                reg.cardinality,
                var.cardinality()
            )));
        }
        let parent_regs = var
            .parents()
            .iter()
            .map(|p| layout.register(p))
            .collect::<Result<Vec<_>, _>>()?;
        let parent_cards = network.parent_cardinalities(var);

        for (row_idx, row) in var.cpt().iter().enumerate() {
            check_normalized(var, row_idx, row, tolerance)?;

            let parent_values = unrank_row(row_idx, &parent_cards);
            let controls: Vec<(usize, bool)> = parent_regs
                .iter()
                .zip(&parent_values)
                .flat_map(|(r, &v)| r.bits_of(v))
                .collect();
            load_distribution(&mut circuit, reg, row, &controls)?;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        variables = network.len(),
        qubits = circuit.num_qubits(),
        gates = circuit.len(),
        "built state preparation circuit"
    );

    Ok(circuit)
}

/// Fails with `UnnormalizedDistribution` if `row` does not sum to 1 within `tolerance`.
pub fn check_normalized(
    var: &Variable,
    row_idx: usize,
    row: &[f64],
    tolerance: f64,
) -> Result<(), InferenceError> {
    if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(InferenceError::InvalidNetwork(format!(
            "'{}' row {} contains invalid probability {}",
            var.name(),
            row_idx,
            bad
        )));
    }
    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(InferenceError::UnnormalizedDistribution {
            variable: var.name().to_string(),
            row: row_idx,
            sum,
        });
    }
    Ok(())
}

/// Parent values for a mixed-radix row index (first parent most significant).
fn unrank_row(mut row_idx: usize, parent_cards: &[usize]) -> Vec<usize> {
    let mut values = vec![0; parent_cards.len()];
    for (slot, &card) in values.iter_mut().zip(parent_cards).rev() {
        *slot = row_idx % card;
        row_idx /= card;
    }
    values
}

/// Writes `probs` into `reg` under the given controls.
fn load_distribution(
    circuit: &mut Circuit,
    reg: &VariableRegister,
    probs: &[f64],
    controls: &[(usize, bool)],
) -> Result<(), InferenceError> {
    let size = 1usize << reg.width;
    let padded: Vec<f64> = (0..size)
        .map(|v| probs.get(v).copied().unwrap_or(0.0))
        .collect();

    for level in 0..reg.width {
        let target = reg.start + level;
        let block = size >> level;
        let half = block / 2;

        for prefix in 0..(1usize << level) {
            let base = prefix * block;
            let total: f64 = padded[base..base + block].iter().sum();
            if total <= MASS_EPSILON {
                continue;
            }
            let upper: f64 = padded[base + half..base + block].iter().sum();
            let ratio = (upper / total).clamp(0.0, 1.0);
            if ratio <= 0.0 {
                continue;
            }
            let theta = 2.0 * ratio.sqrt().asin();

            let mut ctl = controls.to_vec();
            for j in 0..level {
                let shift = level - 1 - j;
                ctl.push((reg.start + j, (prefix >> shift) & 1 == 1));
            }
            circuit.controlled_on(Gate::Ry(theta), target, &ctl)?;
        }
    }
    Ok(())
}
