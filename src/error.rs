//! Error types for the circuit solver.
//!
//! This module provides a unified error type [`CircuitError`] that covers
//! all error conditions that can occur during input validation, linear
//! solving, and time stepping.

use thiserror::Error;

/// Result type alias using [`CircuitError`].
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Unified error type for all solver operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitError {
    // ============ Input Validation Errors ============
    /// Invalid element parameter value
    #[error("Invalid parameter '{param}' for {element}: {message}")]
    InvalidParameter {
        element: String,
        param: String,
        message: String,
    },

    /// Floating node (connected to elements but not to the reference node)
    #[error("Floating node '{node}' detected - no path to ground")]
    FloatingNode { node: String },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - circuit may have a conflicting voltage loop or floating node")]
    SingularMatrix,

    /// The solve finished but produced NaN or infinite values
    #[error("Non-finite value in solution vector at index {index}")]
    NonFiniteSolution { index: usize },
}

impl CircuitError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        element: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            element: element.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_simulation_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }
}
