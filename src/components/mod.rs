//! Element models for circuit simulation.
//!
//! This module provides the two-terminal elements the solver understands:
//! - Ideal: Battery, Resistor, Current Source (stamped directly)
//! - Compound: Resistive Battery (battery + internal resistance)
//! - Reactive: Capacitor, Inductor (carry an [`ElementState`] between steps)
//!
//! Compound and reactive elements are never stamped directly. For every
//! step they are replaced by a [`Companion`]: an ideal battery in series
//! with a resistor.

mod linear;
mod sources;

pub use linear::{Capacitor, Inductor, Resistor};
pub use sources::{Battery, CurrentSource, ResistiveBattery};

use crate::circuit::NodeId;

/// Anything connected between exactly two nodes.
pub trait TwoTerminal {
    /// Terminal nodes as `[node0, node1]`.
    fn nodes(&self) -> [NodeId; 2];

    /// The larger of the two terminal node indices.
    fn max_node(&self) -> NodeId {
        let [a, b] = self.nodes();
        a.max(b)
    }
}

/// Persistent state of a reactive element, carried from the previous
/// accepted step.
///
/// `voltage` is `V(node1) - V(node0)`; `current` flows through the element
/// from node0 to node1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementState {
    pub voltage: f64,
    pub current: f64,
}

impl ElementState {
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }
}

/// Series battery + resistor stand-in for a compound or reactive element.
///
/// The battery sits between node0 and the internal node, the resistor
/// between the internal node and node1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Companion {
    pub voltage: f64,
    pub resistance: f64,
}
