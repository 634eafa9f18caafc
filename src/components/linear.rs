//! Linear passive components: Resistor, Capacitor, Inductor.

use crate::circuit::NodeId;

use super::{Companion, ElementState, TwoTerminal};

/// An ideal linear resistor.
///
/// Stamps a conductance directly into the nodal matrix; it adds no unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pub nodes: [NodeId; 2],
    /// Resistance in ohms
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(nodes: [NodeId; 2], resistance: f64) -> Self {
        Self { nodes, resistance }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Current flowing through the resistor from node0 to node1, given the
    /// two terminal voltages.
    pub fn current(&self, v0: f64, v1: f64) -> f64 {
        (v0 - v1) * self.conductance()
    }
}

impl TwoTerminal for Resistor {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }
}

/// A capacitor.
///
/// Between time steps the capacitor is replaced by its trapezoidal companion:
/// a battery in series with a resistor. With `v = V(node1) - V(node0)` and the
/// current `i` flowing from node0 to node1, the element obeys
/// `C dv/dt = -i`, and the trapezoidal rule gives
///
/// ```text
/// v(n) = v(n-1) - dt/(2C) * (i(n) + i(n-1))
/// ```
///
/// which is exactly a battery of `v(n-1) - Rc*i(n-1)` in series with `Rc = dt/(2C)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Capacitor {
    pub nodes: [NodeId; 2],
    /// Capacitance in farads
    pub capacitance: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self { nodes, capacitance }
    }

    /// Companion series resistance `dt / 2C`.
    pub fn companion_resistance(&self, dt: f64) -> f64 {
        dt / 2.0 / self.capacitance
    }

    /// Trapezoidal companion model for one step of length `dt` starting at `state`.
    pub fn companion(&self, state: &ElementState, dt: f64) -> Companion {
        let resistance = self.companion_resistance(dt);
        Companion {
            voltage: state.voltage - resistance * state.current,
            resistance,
        }
    }
}

impl TwoTerminal for Capacitor {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }
}

/// An inductor.
///
/// With `v = V(node1) - V(node0)` and the current `i` flowing from node0 to
/// node1, the element obeys `L di/dt = -v`. The trapezoidal rule gives
///
/// ```text
/// v(n) = (Rl*i(n-1) - v(n-1)) - Rl*i(n),   Rl = 2L/dt
/// ```
///
/// so the companion is a battery of `Rl*i(n-1) - v(n-1)` in series with `Rl`.
#[derive(Debug, Clone, PartialEq)]
pub struct Inductor {
    pub nodes: [NodeId; 2],
    /// Inductance in henries
    pub inductance: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(nodes: [NodeId; 2], inductance: f64) -> Self {
        Self { nodes, inductance }
    }

    /// Companion series resistance `2L / dt`.
    pub fn companion_resistance(&self, dt: f64) -> f64 {
        2.0 * self.inductance / dt
    }

    /// Trapezoidal companion model for one step of length `dt` starting at `state`.
    pub fn companion(&self, state: &ElementState, dt: f64) -> Companion {
        let resistance = self.companion_resistance(dt);
        Companion {
            voltage: resistance * state.current - state.voltage,
            resistance,
        }
    }
}

impl TwoTerminal for Inductor {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }
}
