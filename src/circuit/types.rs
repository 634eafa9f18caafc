//! Core types for circuit representation.

use std::fmt;

/// A unique identifier for a node in the circuit.
/// Node 0 is always ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node (always index 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

/// Index of a battery branch-current unknown in the MNA system.
///
/// Batteries are numbered in the order they were handed to the linear
/// solver; the current of battery `k` lives right after the node voltages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Stable handle to an element of a [`DynamicCircuit`](crate::solver::DynamicCircuit).
///
/// The index refers to the position of the element within the list of its
/// kind. Handles stay valid across snapshots derived from the same circuit,
/// because state updates never reorder or drop elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Battery(usize),
    Resistor(usize),
    CurrentSource(usize),
    ResistiveBattery(usize),
    Capacitor(usize),
    Inductor(usize),
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Battery(i) => write!(f, "battery #{}", i),
            ElementRef::Resistor(i) => write!(f, "resistor #{}", i),
            ElementRef::CurrentSource(i) => write!(f, "current source #{}", i),
            ElementRef::ResistiveBattery(i) => write!(f, "resistive battery #{}", i),
            ElementRef::Capacitor(i) => write!(f, "capacitor #{}", i),
            ElementRef::Inductor(i) => write!(f, "inductor #{}", i),
        }
    }
}
