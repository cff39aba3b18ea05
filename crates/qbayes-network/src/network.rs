//! # Discrete Bayesian Network
//!
//! A network is an ordered list of [`Variable`]s. Each variable has a finite
//! state space `0..cardinality`, an ordered parent list, and a conditional
//! probability table (CPT) with one row per parent-value assignment.
//!
//! ## CPT row order
//!
//! Rows are laid out in mixed radix with the first declared parent most
//! significant. For parents `(P0, P1)` with cardinalities `(c0, c1)`, the row
//! for parent values `(p0, p1)` sits at index `p0 * c1 + p1`. Root variables
//! have a single row.
//!
//! ## Validation
//!
//! [`BayesianNetwork::new`] checks structure: names are unique and non-empty,
//! cardinalities are at least 2, every parent exists, the parent relation is
//! acyclic, and every CPT has the right shape with finite, non-negative
//! entries. Row sums are not checked here.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::assignment::Assignment;
use crate::errors::NetworkError;

/// A discrete random variable together with its conditional distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    name: String,
    cardinality: usize,
    parents: Vec<String>,
    cpt: Vec<Vec<f64>>,
}

impl Variable {
    /// Creates a variable. Shape checks happen in [`BayesianNetwork::new`].
    pub fn new(
        name: impl Into<String>,
        cardinality: usize,
        parents: Vec<String>,
        cpt: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            name: name.into(),
            cardinality,
            parents,
            cpt,
        }
    }

    /// Creates a parentless variable with the given marginal distribution.
    pub fn root(name: impl Into<String>, distribution: Vec<f64>) -> Self {
        let cardinality = distribution.len();
        Self::new(name, cardinality, Vec::new(), vec![distribution])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// All CPT rows in mixed-radix parent order.
    pub fn cpt(&self) -> &[Vec<f64>] {
        &self.cpt
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.cpt.get(index).map(Vec::as_slice)
    }
}

/// A validated directed acyclic graph of discrete variables.
#[derive(Debug, Clone)]
pub struct BayesianNetwork {
    variables: Vec<Variable>,
    index: FxHashMap<String, usize>,
    topo_order: Vec<usize>,
}

impl BayesianNetwork {
    /// Validates and assembles a network from variables in declaration order.
    pub fn new(variables: Vec<Variable>) -> Result<Self, NetworkError> {
        let mut index = FxHashMap::default();
        for (i, var) in variables.iter().enumerate() {
            if var.name.is_empty() {
                return Err(NetworkError::InvalidVariable {
                    name: var.name.clone(),
                    reason: "name must not be empty".into(),
                });
            }
            if var.cardinality < 2 {
                return Err(NetworkError::InvalidVariable {
                    name: var.name.clone(),
                    reason: format!("cardinality must be >= 2, got {}", var.cardinality),
                });
            }
            if index.insert(var.name.clone(), i).is_some() {
                return Err(NetworkError::DuplicateVariable(var.name.clone()));
            }
        }

        for var in &variables {
            let mut seen = BTreeSet::new();
            for parent in &var.parents {
                if !index.contains_key(parent) {
                    return Err(NetworkError::UnknownParent {
                        variable: var.name.clone(),
                        parent: parent.clone(),
                    });
                }
                if !seen.insert(parent.as_str()) {
                    return Err(NetworkError::InvalidVariable {
                        name: var.name.clone(),
                        reason: format!("parent '{}' listed twice", parent),
                    });
                }
            }
        }

        let topo_order = topological_order(&variables, &index)?;

        let network = Self {
            variables,
            index,
            topo_order,
        };
        for var in &network.variables {
            network.check_cpt_shape(var)?;
        }
        Ok(network)
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    /// Declaration index of a variable.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Variables ordered so that every parent precedes its children.
    ///
    /// Ties are broken by declaration order, so the order is stable.
    pub fn topological_order(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.topo_order.iter().map(move |&i| &self.variables[i])
    }

    /// Cardinalities of `var`'s parents, in parent order.
    pub fn parent_cardinalities(&self, var: &Variable) -> Vec<usize> {
        var.parents
            .iter()
            .filter_map(|p| self.variable(p))
            .map(Variable::cardinality)
            .collect()
    }

    /// Mixed-radix CPT row index for the given parent values.
    pub fn row_index(&self, var: &Variable, parent_values: &[usize]) -> Result<usize, NetworkError> {
        if parent_values.len() != var.parents.len() {
            return Err(NetworkError::InvalidCpt {
                variable: var.name.clone(),
                reason: format!(
                    "expected {} parent values, got {}",
                    var.parents.len(),
                    parent_values.len()
                ),
            });
        }
        let mut row = 0usize;
        for (parent, &value) in var.parents.iter().zip(parent_values) {
            let card = self
                .variable(parent)
                .map(Variable::cardinality)
                .ok_or_else(|| NetworkError::UnknownVariable(parent.clone()))?;
            if value >= card {
                return Err(NetworkError::ValueOutOfRange {
                    variable: parent.clone(),
                    value,
                    cardinality: card,
                });
            }
            row = row * card + value;
        }
        Ok(row)
    }

    /// Checks that every variable in `assignment` exists and is in range.
    pub fn check_assignment(&self, assignment: &Assignment) -> Result<(), NetworkError> {
        for (name, value) in assignment.iter() {
            let var = self
                .variable(name)
                .ok_or_else(|| NetworkError::UnknownVariable(name.to_string()))?;
            if value >= var.cardinality {
                return Err(NetworkError::ValueOutOfRange {
                    variable: name.to_string(),
                    value,
                    cardinality: var.cardinality,
                });
            }
        }
        Ok(())
    }

    /// Exact joint probability of a full assignment via the chain rule.
    pub fn joint_probability(&self, assignment: &Assignment) -> Result<f64, NetworkError> {
        self.check_assignment(assignment)?;
        let mut p = 1.0;
        for var in &self.variables {
            let value = assignment
                .get(&var.name)
                .ok_or_else(|| NetworkError::IncompleteAssignment(var.name.clone()))?;
            let mut parent_values = Vec::with_capacity(var.parents.len());
            for parent in &var.parents {
                let pv = assignment
                    .get(parent)
                    .ok_or_else(|| NetworkError::IncompleteAssignment(parent.clone()))?;
                parent_values.push(pv);
            }
            let row = self.row_index(var, &parent_values)?;
            p *= var.cpt[row][value];
        }
        Ok(p)
    }

    fn check_cpt_shape(&self, var: &Variable) -> Result<(), NetworkError> {
        let expected_rows: usize = self.parent_cardinalities(var).iter().product();
        if var.cpt.len() != expected_rows {
            return Err(NetworkError::InvalidCpt {
                variable: var.name.clone(),
                reason: format!("expected {} rows, got {}", expected_rows, var.cpt.len()),
            });
        }
        for (r, row) in var.cpt.iter().enumerate() {
            if row.len() != var.cardinality {
                return Err(NetworkError::InvalidCpt {
                    variable: var.name.clone(),
                    reason: format!(
                        "row {} has {} entries, expected {}",
                        r,
                        row.len(),
                        var.cardinality
                    ),
                });
            }
            if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
                return Err(NetworkError::InvalidCpt {
                    variable: var.name.clone(),
                    reason: format!("row {} contains invalid probability {}", r, bad),
                });
            }
        }
        Ok(())
    }
}

/// Kahn's algorithm, always releasing the lowest declaration index first.
fn topological_order(
    variables: &[Variable],
    index: &FxHashMap<String, usize>,
) -> Result<Vec<usize>, NetworkError> {
    let n = variables.len();
    let mut in_degree = vec![0usize; n];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, var) in variables.iter().enumerate() {
        for parent in &var.parents {
            let p = index[parent];
            children[p].push(i);
            in_degree[i] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &child in &children[i] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() != n {
        let stuck = (0..n)
            .find(|&i| in_degree[i] > 0)
            .map(|i| variables[i].name.clone())
            .unwrap_or_default();
        return Err(NetworkError::Cycle(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> BayesianNetwork {
        BayesianNetwork::new(vec![
            Variable::new("C", 2, vec!["B".into()], vec![vec![0.9, 0.1], vec![0.2, 0.8]]),
            Variable::new("B", 2, vec!["A".into()], vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            Variable::root("A", vec![0.3, 0.7]),
        ])
        .unwrap()
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let net = chain();
        let order: Vec<&str> = net.topological_order().map(Variable::name).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn declaration_order_is_preserved() {
        let net = chain();
        let names: Vec<&str> = net.variables().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn structure_accessors_reflect_declaration() {
        let net = chain();
        assert_eq!(net.index_of("A"), Some(2));
        assert_eq!(net.index_of("C"), Some(0));
        assert_eq!(net.index_of("Z"), None);

        let a = net.variable("A").unwrap();
        let c = net.variable("C").unwrap();
        assert!(a.is_root());
        assert!(!c.is_root());
        assert_eq!(a.row(0), Some(&[0.3, 0.7][..]));
        assert_eq!(c.row(1), Some(&[0.2, 0.8][..]));
        assert_eq!(c.row(2), None);
    }

    #[test]
    fn cycle_is_rejected() {
        let err = BayesianNetwork::new(vec![
            Variable::new("A", 2, vec!["B".into()], vec![vec![0.5, 0.5]; 2]),
            Variable::new("B", 2, vec!["A".into()], vec![vec![0.5, 0.5]; 2]),
        ])
        .unwrap_err();
        assert!(matches!(err, NetworkError::Cycle(_)));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let err = BayesianNetwork::new(vec![Variable::new(
            "A",
            2,
            vec!["Z".into()],
            vec![vec![0.5, 0.5]; 2],
        )])
        .unwrap_err();
        assert_eq!(
            err,
            NetworkError::UnknownParent {
                variable: "A".into(),
                parent: "Z".into()
            }
        );
    }

    #[test]
    fn cardinality_one_is_rejected() {
        let err = BayesianNetwork::new(vec![Variable::root("A", vec![1.0])]).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidVariable { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = BayesianNetwork::new(vec![
            Variable::root("A", vec![0.5, 0.5]),
            Variable::root("A", vec![0.5, 0.5]),
        ])
        .unwrap_err();
        assert_eq!(err, NetworkError::DuplicateVariable("A".into()));
    }

    #[test]
    fn cpt_row_count_must_match_parents() {
        let err = BayesianNetwork::new(vec![
            Variable::root("A", vec![0.5, 0.5]),
            Variable::new("B", 3, vec!["A".into()], vec![vec![0.2, 0.3, 0.5]]),
        ])
        .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidCpt { .. }));
    }

    #[test]
    fn negative_probability_is_rejected() {
        let err = BayesianNetwork::new(vec![Variable::root("A", vec![1.5, -0.5])]).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidCpt { .. }));
    }

    #[test]
    fn row_index_is_mixed_radix_first_parent_major() {
        let net = BayesianNetwork::new(vec![
            Variable::root("P", vec![0.5, 0.5]),
            Variable::root("Q", vec![0.2, 0.3, 0.5]),
            Variable::new(
                "X",
                2,
                vec!["P".into(), "Q".into()],
                vec![vec![0.5, 0.5]; 6],
            ),
        ])
        .unwrap();
        let x = net.variable("X").unwrap();
        assert_eq!(net.row_index(x, &[0, 0]).unwrap(), 0);
        assert_eq!(net.row_index(x, &[0, 2]).unwrap(), 2);
        assert_eq!(net.row_index(x, &[1, 0]).unwrap(), 3);
        assert_eq!(net.row_index(x, &[1, 2]).unwrap(), 5);
        assert!(net.row_index(x, &[2, 0]).is_err());
    }

    #[test]
    fn joint_probability_follows_chain_rule() {
        let net = chain();
        let a = Assignment::from([("A", 1), ("B", 1), ("C", 1)]);
        let p = net.joint_probability(&a).unwrap();
        assert!((p - 0.7 * 1.0 * 0.8).abs() < 1e-12);

        let partial = Assignment::from([("A", 1)]);
        assert!(matches!(
            net.joint_probability(&partial),
            Err(NetworkError::IncompleteAssignment(_))
        ));
    }

    #[test]
    fn check_assignment_flags_unknown_and_out_of_range() {
        let net = chain();
        assert_eq!(
            net.check_assignment(&Assignment::from([("Z", 0)])),
            Err(NetworkError::UnknownVariable("Z".into()))
        );
        assert!(matches!(
            net.check_assignment(&Assignment::from([("A", 2)])),
            Err(NetworkError::ValueOutOfRange { .. })
        ));
    }
}
