//! WASM bindings for Circuit Dynamics.
//!
//! This module provides JavaScript-friendly bindings so a browser-side
//! circuit editor can step its circuit once per animation frame.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuitSim } from 'circuit_dynamics';
//!
//! await init();
//!
//! const sim = new WasmCircuitSim();
//! sim.add_battery(0, 1, 9.0, 0.0);
//! sim.add_resistor(1, 2, 10.0);
//! const cap = sim.add_capacitor(2, 0, 0.01);
//!
//! // In requestAnimationFrame():
//! sim.step(1 / 60);
//! const amps = sim.current(cap);
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{Branch, BranchKind, Circuit, NodeId};
use crate::solver::{Simulator, SimulatorConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// WASM-compatible circuit simulator.
///
/// Branches are addressed by the index returned when they were added.
#[wasm_bindgen]
pub struct WasmCircuitSim {
    simulator: Simulator,
}

impl WasmCircuitSim {
    fn add(&mut self, n0: usize, n1: usize, kind: BranchKind) -> usize {
        let circuit = self.simulator.circuit_mut();
        let name = format!("b{}", circuit.branches.len());
        circuit.add(Branch::new(name, [NodeId(n0), NodeId(n1)], kind))
    }

    fn branch(&self, index: usize) -> Option<&Branch> {
        self.simulator.circuit().branches.get(index)
    }
}

impl Default for WasmCircuitSim {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmCircuitSim {
    /// Create an empty simulator with default subdivision settings.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmCircuitSim {
        WasmCircuitSim {
            simulator: Simulator::new(Circuit::new()),
        }
    }

    /// Create an empty simulator with custom subdivision settings.
    ///
    /// # Arguments
    /// * `error_threshold` - Accepted reactive current discrepancy (default: 1e-6)
    /// * `min_dt` - Shortest sub-step in seconds (default: 1e-8)
    #[wasm_bindgen]
    pub fn with_config(error_threshold: f64, min_dt: f64) -> WasmCircuitSim {
        let config = SimulatorConfig::new()
            .with_error_threshold(error_threshold)
            .with_min_dt(min_dt);
        WasmCircuitSim {
            simulator: Simulator::with_config(Circuit::new(), config),
        }
    }

    #[wasm_bindgen]
    pub fn add_battery(&mut self, n0: usize, n1: usize, voltage: f64, internal_resistance: f64) -> usize {
        self.add(
            n0,
            n1,
            BranchKind::Battery {
                voltage,
                internal_resistance,
            },
        )
    }

    #[wasm_bindgen]
    pub fn add_resistor(&mut self, n0: usize, n1: usize, resistance: f64) -> usize {
        self.add(n0, n1, BranchKind::Resistor { resistance })
    }

    #[wasm_bindgen]
    pub fn add_switch(&mut self, n0: usize, n1: usize, resistance: f64, closed: bool) -> usize {
        self.add(n0, n1, BranchKind::Switch { resistance, closed })
    }

    #[wasm_bindgen]
    pub fn add_current_source(&mut self, n0: usize, n1: usize, current: f64) -> usize {
        self.add(n0, n1, BranchKind::CurrentSource { current })
    }

    #[wasm_bindgen]
    pub fn add_capacitor(&mut self, n0: usize, n1: usize, capacitance: f64) -> usize {
        self.add(n0, n1, BranchKind::Capacitor { capacitance })
    }

    #[wasm_bindgen]
    pub fn add_inductor(&mut self, n0: usize, n1: usize, inductance: f64) -> usize {
        self.add(n0, n1, BranchKind::Inductor { inductance })
    }

    /// Open or close a switch. Returns `false` if `branch` is not a switch.
    #[wasm_bindgen]
    pub fn set_switch(&mut self, branch: usize, closed: bool) -> bool {
        match self.simulator.circuit_mut().branches.get_mut(branch) {
            Some(Branch {
                kind: BranchKind::Switch { closed: state, .. },
                ..
            }) => {
                *state = closed;
                true
            }
            _ => false,
        }
    }

    /// Advance the simulation by `dt` seconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f64) -> Result<(), JsValue> {
        self.simulator
            .step(dt)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Current through a branch averaged over the last step.
    #[wasm_bindgen]
    pub fn current(&self, branch: usize) -> Option<f64> {
        self.branch(branch).map(|b| b.current)
    }

    /// Current through a branch at the end of the last step.
    #[wasm_bindgen]
    pub fn mna_current(&self, branch: usize) -> Option<f64> {
        self.branch(branch).map(|b| b.mna_current)
    }

    /// Voltage across a branch at the end of the last step.
    #[wasm_bindgen]
    pub fn voltage_drop(&self, branch: usize) -> Option<f64> {
        self.branch(branch).map(|b| b.voltage_drop)
    }

    /// Get the current voltage at a node, or `undefined` before the first step.
    #[wasm_bindgen]
    pub fn node_voltage(&self, node: usize) -> Option<f64> {
        self.simulator.node_voltage(NodeId(node))
    }

    /// Simulated time in seconds.
    #[wasm_bindgen(getter)]
    pub fn time(&self) -> f64 {
        self.simulator.time()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
