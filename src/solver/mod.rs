//! Companion-model MNA solver.
//!
//! This module provides the numerical engine for circuit simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and battery branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   0 ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect batteries to nodes
//! - v is the vector of node voltages (ground excluded)
//! - j is the vector of battery currents
//! - i is the sum of current sources into each node
//! - e is the vector of battery voltages
//!
//! ## Time stepping
//!
//! Capacitors, inductors and resistive batteries are replaced by companion
//! battery/resistor pairs ([`companion`]), the resulting linear circuit is
//! solved ([`mna`]), and the step is subdivided adaptively until the
//! reactive currents agree between one full step and two half steps
//! ([`subdivision`]).

pub mod companion;
pub mod dynamic;
pub mod mna;
pub mod result;
pub mod simulator;
pub mod subdivision;

pub use companion::{to_mna_circuit, CompanionCircuit, CompanionProbes, CurrentProbe};
pub use dynamic::{
    euclidean_distance, CircuitBuilder, CompanionStepper, DynamicCircuit, DynamicSolution,
    DynamicState, Elements,
};
pub use mna::{LinearCircuit, MnaMatrix, Solution};
pub use result::{CircuitResult, SolvedStep};
pub use simulator::{Simulator, SimulatorConfig};
pub use subdivision::{ResultSet, Steppable, SubStep, TimestepSubdivisions};

/// Default subdivision acceptance threshold on reactive currents (amperes).
pub const DEFAULT_ERROR_THRESHOLD: f64 = 1e-6;

/// Default floor on subdivided step length (seconds).
pub const DEFAULT_MIN_DT: f64 = 1e-8;

/// Default limit on nested halvings of one external step.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Pivots no larger than this fraction of the largest matrix entry make
/// the system singular.
pub const MIN_PIVOT: f64 = 1e-15;
