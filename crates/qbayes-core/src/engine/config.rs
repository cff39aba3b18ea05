//! Inference configuration.

use crate::engine::errors::InferenceError;

/// Default shot budget per rejection-sampling call.
pub const DEFAULT_SHOTS: u64 = 10_000;

/// Default tolerance on CPT row sums.
pub const DEFAULT_NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// Configuration for [`crate::engine::inference::InferenceEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InferenceConfig {
    /// Shots per simulation call.
    pub shots: u64,
    /// Grover iterates appended after state preparation. One is the
    /// documented policy; zero gives plain rejection sampling.
    pub grover_iterations: usize,
    /// Maximum allowed deviation of a CPT row sum from 1.
    pub normalization_tolerance: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            shots: DEFAULT_SHOTS,
            grover_iterations: 1,
            normalization_tolerance: DEFAULT_NORMALIZATION_TOLERANCE,
        }
    }
}

impl InferenceConfig {
    pub fn with_shots(mut self, shots: u64) -> Self {
        self.shots = shots;
        self
    }

    pub fn with_grover_iterations(mut self, iterations: usize) -> Self {
        self.grover_iterations = iterations;
        self
    }

    pub fn with_normalization_tolerance(mut self, tolerance: f64) -> Self {
        self.normalization_tolerance = tolerance;
        self
    }

    pub fn validate(self) -> Result<Self, InferenceError> {
        if self.shots == 0 {
            return Err(InferenceError::InvalidConfig(
                "inference: shots must be > 0".into(),
            ));
        }
        if !self.normalization_tolerance.is_finite() || self.normalization_tolerance <= 0.0 {
            return Err(InferenceError::InvalidConfig(
                "inference: normalization_tolerance must be finite and > 0".into(),
            ));
        }
        Ok(self)
    }
}
