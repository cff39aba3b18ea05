//! # QBayes Network
//!
//! Data model for discrete Bayesian networks: variables with finite
//! cardinality, their parent lists, and conditional probability tables.
//!
//! The inference engine in `qbayes-core` consumes a [`BayesianNetwork`] that
//! has already passed structural validation here. Numeric normalization of
//! CPT rows is checked later, when the state-preparation circuit is built.

pub mod assignment;
pub mod errors;
pub mod network;

// Re-export commonly used types
pub use assignment::Assignment;
pub use errors::NetworkError;
pub use network::{BayesianNetwork, Variable};
