//! # Circuit Dynamics
//!
//! A time-domain solver for linear circuits of batteries, resistors,
//! current sources, capacitors and inductors.
//!
//! This library provides:
//! - Modified Nodal Analysis (MNA) for resistive networks
//! - Trapezoidal companion models for capacitors and inductors
//! - Adaptive timestep subdivision bounded by a local error threshold
//! - A mutable branch-level [`Circuit`] stepped by a [`Simulator`]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Identifiers, the branch model and input validation
//! - [`components`] - Element models and their companion equivalents
//! - [`solver`] - MNA assembly, companion circuits, subdivision and results
//!
//! ## Usage
//!
//! ```
//! use circuit_dynamics::{Branch, Circuit, NodeId, Simulator};
//!
//! let mut circuit = Circuit::new();
//! circuit.add(Branch::battery("battery", [NodeId(0), NodeId(1)], 9.0, 0.0));
//! circuit.add(Branch::resistor("resistor", [NodeId(1), NodeId(2)], 10.0));
//! circuit.add(Branch::capacitor("capacitor", [NodeId(2), NodeId(0)], 0.01));
//!
//! let mut sim = Simulator::new(circuit);
//! sim.step(1.0 / 30.0)?;
//! let charging = sim.circuit().find("capacitor").map(|c| c.mna_current);
//! # assert!(charging.is_some());
//! # Ok::<(), circuit_dynamics::CircuitError>(())
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmCircuitSim } from 'circuit_dynamics';
//!
//! const sim = new WasmCircuitSim();
//! const cap = sim.add_capacitor(2, 0, 0.01);
//! sim.step(1 / 30);
//! ```
//!
//! ## Circuit Simulation Method
//!
//! For each external time step dt:
//!
//! 1. Replace every capacitor, inductor and resistive battery by a battery
//!    in series with a resistor, valued from the element's previous state
//! 2. Assemble and solve Ax = z for node voltages and battery currents
//! 3. Compare one step of dt with two steps of dt/2 and halve until the
//!    reactive currents agree within the error threshold
//!
//! Reactive elements (C, L) are discretized using the trapezoidal rule for
//! accuracy and stability.

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{Branch, BranchKind, Circuit, ElementRef, NodeId};
pub use error::{CircuitError, Result};
pub use solver::{CircuitResult, DynamicCircuit, Simulator, SimulatorConfig, TimestepSubdivisions};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuitSim;
