//! The inference engine for QBayes.
//!
//! This module provides:
//! - **errors**: Error types for construction, simulation, and inference failures
//! - **config**: Shot budget, Grover iteration count, and CPT tolerance
//! - **registers**: Variable-to-qubit register allocation and bitstring decoding
//! - **state_prep**: Circuit preparing the network's joint distribution
//! - **oracle**: Phase oracle marking evidence-consistent basis states
//! - **amplification**: Grover iterate built from the oracle and state preparation
//! - **inference**: Rejection sampling and conditional probability estimates

pub mod amplification;
pub mod config;
pub mod errors;
pub mod inference;
pub mod oracle;
pub mod registers;
pub mod state_prep;
