//! Voltage and current sources.

use crate::circuit::NodeId;

use super::{Companion, TwoTerminal};

/// An ideal battery (voltage source).
///
/// Batteries require an extra row/column in the MNA matrix for the
/// branch current. The battery enforces: V(node1) - V(node0) = voltage
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub nodes: [NodeId; 2],
    pub voltage: f64,
}

impl Battery {
    /// Create a new ideal battery.
    pub fn new(nodes: [NodeId; 2], voltage: f64) -> Self {
        Self { nodes, voltage }
    }
}

impl TwoTerminal for Battery {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }
}

/// An ideal current source.
///
/// Current sources add directly to the RHS vector of the MNA equations.
/// The source drives `current` through itself from node0 to node1.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSource {
    pub nodes: [NodeId; 2],
    pub current: f64,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(nodes: [NodeId; 2], current: f64) -> Self {
        Self { nodes, current }
    }
}

impl TwoTerminal for CurrentSource {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }
}

/// A battery with a series internal resistance.
///
/// Never stamped directly: it is always expanded into an ideal battery and a
/// resistor sharing a freshly allocated internal node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResistiveBattery {
    pub nodes: [NodeId; 2],
    pub voltage: f64,
    /// Internal resistance in ohms
    pub resistance: f64,
}

impl ResistiveBattery {
    /// Create a new battery with internal resistance.
    pub fn new(nodes: [NodeId; 2], voltage: f64, resistance: f64) -> Self {
        Self {
            nodes,
            voltage,
            resistance,
        }
    }

    /// The series expansion; independent of time step and history.
    pub fn companion(&self) -> Companion {
        Companion {
            voltage: self.voltage,
            resistance: self.resistance,
        }
    }
}

impl TwoTerminal for ResistiveBattery {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }
}
