//! # QBayes Core
//!
//! Approximate inference over discrete Bayesian networks by amplitude-amplified
//! rejection sampling on a simulated quantum circuit.
//!
//! ## Architecture
//!
//! - **circuit**: Gate set and composable [`Circuit`] values
//! - **engine**: Register mapping, state preparation, evidence oracle,
//!   amplification, and the [`InferenceEngine`]
//! - **simulation**: The [`SimulationBackend`] seam and a reference
//!   statevector backend
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use qbayes_core::{Assignment, BayesianNetwork, InferenceEngine, StatevectorBackend, Variable};
//!
//! let network = BayesianNetwork::new(vec![
//!     Variable::root("Rain", vec![0.8, 0.2]),
//!     Variable::new("WetGrass", 2, vec!["Rain".into()], vec![vec![0.9, 0.1], vec![0.2, 0.8]]),
//! ])?;
//! let engine = InferenceEngine::from_network(network, Arc::new(StatevectorBackend::seeded(7)))?;
//! let p = engine.inference(
//!     &Assignment::from([("Rain", 1)]),
//!     Some(&Assignment::from([("WetGrass", 1)])),
//!     None,
//! )?;
//! ```

#![forbid(unsafe_code)]

pub mod circuit;
pub mod engine;
pub mod simulation;

// Re-export commonly used types
pub use circuit::{Circuit, Gate};
pub use engine::config::InferenceConfig;
pub use engine::errors::InferenceError;
pub use engine::inference::{EngineSource, InferenceEngine, PreparedCircuit, RejectionSamples};
pub use engine::registers::{RegisterLayout, VariableRegister};
pub use simulation::{SampleCounts, SimulationBackend, Statevector, StatevectorBackend};

pub use qbayes_network::{Assignment, BayesianNetwork, NetworkError, Variable};
