//! Companion model construction.
//!
//! Every compound or reactive element is replaced by an ideal battery from
//! its node0 to a freshly allocated internal node, followed by a resistor
//! from that internal node to its node1. The companion battery carries the
//! element's current, so it is also how that current is read back.

use crate::circuit::{BranchId, ElementRef, NodeId};
use crate::components::{Battery, Companion, Resistor};

use super::dynamic::{DynamicCircuit, Elements};
use super::mna::{LinearCircuit, Solution};

/// How to read one element's current out of a linear [`Solution`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentProbe {
    /// Current of a battery unknown (plain or companion battery).
    Branch(BranchId),
    /// Ohm's law across two nodes.
    Conductance { nodes: [NodeId; 2], conductance: f64 },
    /// Independent of the solution (current sources).
    Fixed(f64),
}

impl CurrentProbe {
    /// Current flowing from node0 to node1 through the probed element.
    pub fn read(&self, solution: &Solution) -> f64 {
        match *self {
            CurrentProbe::Branch(branch) => solution.battery_current(branch),
            CurrentProbe::Conductance { nodes, conductance } => {
                -solution.voltage_across(nodes) * conductance
            }
            CurrentProbe::Fixed(current) => current,
        }
    }
}

/// Companion battery indices for each compound element, by element handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanionProbes {
    resistive_batteries: Vec<BranchId>,
    capacitors: Vec<BranchId>,
    inductors: Vec<BranchId>,
}

impl CompanionProbes {
    /// Resolve the current probe for an element of `elements`.
    ///
    /// Panics if the handle does not belong to the circuit these probes were
    /// built for.
    pub fn probe(&self, elements: &Elements, element: ElementRef) -> CurrentProbe {
        match element {
            // Plain batteries keep their position at the front of the battery list
            ElementRef::Battery(i) => {
                assert!(i < elements.batteries.len(), "no such element: {}", element);
                CurrentProbe::Branch(BranchId(i))
            }
            ElementRef::Resistor(i) => {
                let r = &elements.resistors[i];
                CurrentProbe::Conductance {
                    nodes: r.nodes,
                    conductance: r.conductance(),
                }
            }
            ElementRef::CurrentSource(i) => CurrentProbe::Fixed(elements.current_sources[i].current),
            ElementRef::ResistiveBattery(i) => CurrentProbe::Branch(self.resistive_batteries[i]),
            ElementRef::Capacitor(i) => CurrentProbe::Branch(self.capacitors[i]),
            ElementRef::Inductor(i) => CurrentProbe::Branch(self.inductors[i]),
        }
    }
}

/// The linearized stand-in for a dynamic circuit over one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionCircuit {
    pub linear: LinearCircuit,
    pub probes: CompanionProbes,
}

/// Incrementally appends companion pairs to a linear circuit.
struct CompanionBuilder {
    linear: LinearCircuit,
    next_node: usize,
}

impl CompanionBuilder {
    /// Stamp a companion between `nodes` and return its battery's branch.
    fn push(&mut self, nodes: [NodeId; 2], companion: Companion) -> BranchId {
        let internal = NodeId(self.next_node);
        self.next_node += 1;

        let branch = BranchId(self.linear.batteries.len());
        self.linear
            .batteries
            .push(Battery::new([nodes[0], internal], companion.voltage));
        self.linear
            .resistors
            .push(Resistor::new([internal, nodes[1]], companion.resistance));
        branch
    }
}

/// Build the linear companion circuit of `circuit` for a step of length `dt`.
///
/// Pure with respect to `circuit`: reactive states are only read.
pub fn to_mna_circuit(circuit: &DynamicCircuit, dt: f64) -> CompanionCircuit {
    let elements = circuit.elements();

    let mut builder = CompanionBuilder {
        linear: LinearCircuit::new(
            elements.batteries.clone(),
            elements.resistors.clone(),
            elements.current_sources.clone(),
        ),
        next_node: elements.max_node().0 + 1,
    };

    let resistive_batteries = elements
        .resistive_batteries
        .iter()
        .map(|b| builder.push(b.nodes, b.companion()))
        .collect();

    let capacitors = elements
        .capacitors
        .iter()
        .zip(circuit.capacitor_states())
        .map(|(c, state)| builder.push(c.nodes, c.companion(state, dt)))
        .collect();

    let inductors = elements
        .inductors
        .iter()
        .zip(circuit.inductor_states())
        .map(|(l, state)| builder.push(l.nodes, l.companion(state, dt)))
        .collect();

    log::trace!(
        "companion circuit: {} batteries, {} resistors, {} current sources over {} nodes",
        builder.linear.batteries.len(),
        builder.linear.resistors.len(),
        builder.linear.current_sources.len(),
        builder.next_node
    );

    CompanionCircuit {
        linear: builder.linear,
        probes: CompanionProbes {
            resistive_batteries,
            capacitors,
            inductors,
        },
    }
}
