//! Caller-side circuit model.
//!
//! A [`Circuit`] is the mutable, long-lived description an interactive
//! simulation edits: branches between junctions, each remembering the
//! results of the last solve. Every time step it is converted into an
//! immutable [`DynamicCircuit`] snapshot, solved, and the results are
//! written back onto the branches.

use crate::components::{
    Battery, Capacitor, CurrentSource, ElementState, Inductor, ResistiveBattery, Resistor,
};
use crate::error::Result;
use crate::solver::{CircuitResult, DynamicCircuit};

use super::types::{ElementRef, NodeId};

/// What a branch is, electrically.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchKind {
    /// Battery with internal resistance; zero resistance makes it ideal.
    Battery { voltage: f64, internal_resistance: f64 },
    /// Anything purely resistive: resistors, wires, bulbs, ammeters.
    Resistor { resistance: f64 },
    /// Conducts like a resistor when closed, absent when open.
    Switch { resistance: f64, closed: bool },
    CurrentSource { current: f64 },
    Capacitor { capacitance: f64 },
    Inductor { inductance: f64 },
}

/// A branch between two junctions, with the outputs of the last solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub name: String,
    pub nodes: [NodeId; 2],
    pub kind: BranchKind,
    /// Current averaged over the last time step
    pub current: f64,
    /// Current at the end of the last time step
    pub mna_current: f64,
    /// `V(node1) - V(node0)` at the end of the last time step
    pub voltage_drop: f64,
}

impl Branch {
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], kind: BranchKind) -> Self {
        Self {
            name: name.into(),
            nodes,
            kind,
            current: 0.0,
            mna_current: 0.0,
            voltage_drop: 0.0,
        }
    }

    pub fn battery(
        name: impl Into<String>,
        nodes: [NodeId; 2],
        voltage: f64,
        internal_resistance: f64,
    ) -> Self {
        Self::new(
            name,
            nodes,
            BranchKind::Battery {
                voltage,
                internal_resistance,
            },
        )
    }

    pub fn resistor(name: impl Into<String>, nodes: [NodeId; 2], resistance: f64) -> Self {
        Self::new(name, nodes, BranchKind::Resistor { resistance })
    }

    pub fn switch(name: impl Into<String>, nodes: [NodeId; 2], resistance: f64, closed: bool) -> Self {
        Self::new(name, nodes, BranchKind::Switch { resistance, closed })
    }

    pub fn current_source(name: impl Into<String>, nodes: [NodeId; 2], current: f64) -> Self {
        Self::new(name, nodes, BranchKind::CurrentSource { current })
    }

    pub fn capacitor(name: impl Into<String>, nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self::new(name, nodes, BranchKind::Capacitor { capacitance })
    }

    pub fn inductor(name: impl Into<String>, nodes: [NodeId; 2], inductance: f64) -> Self {
        Self::new(name, nodes, BranchKind::Inductor { inductance })
    }

    /// Set the persisted state of a reactive branch.
    pub fn with_state(mut self, voltage_drop: f64, mna_current: f64) -> Self {
        self.voltage_drop = voltage_drop;
        self.mna_current = mna_current;
        self
    }

    /// Whether the branch is left out of the solve.
    pub fn is_open(&self) -> bool {
        matches!(self.kind, BranchKind::Switch { closed: false, .. })
    }

    fn state(&self) -> ElementState {
        ElementState::new(self.voltage_drop, self.mna_current)
    }

    fn clear(&mut self) {
        self.current = 0.0;
        self.mna_current = 0.0;
        self.voltage_drop = 0.0;
    }
}

/// A collection of branches; junctions are node indices, ground is node 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    pub branches: Vec<Branch>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch and return its index.
    pub fn add(&mut self, branch: Branch) -> usize {
        self.branches.push(branch);
        self.branches.len() - 1
    }

    /// Find a branch by name.
    pub fn find(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Snapshot the circuit for solving.
    ///
    /// Returns the snapshot and, per branch, the handle of the element it
    /// became (`None` for open switches).
    pub fn to_dynamic(&self) -> Result<(DynamicCircuit, Vec<Option<ElementRef>>)> {
        let mut builder = DynamicCircuit::builder();

        let mapping = self
            .branches
            .iter()
            .map(|branch| {
                let nodes = branch.nodes;
                match branch.kind {
                    BranchKind::Battery {
                        voltage,
                        internal_resistance,
                    } => Some(if internal_resistance > 0.0 {
                        builder.add_resistive_battery(ResistiveBattery::new(
                            nodes,
                            voltage,
                            internal_resistance,
                        ))
                    } else {
                        builder.add_battery(Battery::new(nodes, voltage))
                    }),
                    BranchKind::Resistor { resistance } => {
                        Some(builder.add_resistor(Resistor::new(nodes, resistance)))
                    }
                    BranchKind::Switch { resistance, closed } => {
                        closed.then(|| builder.add_resistor(Resistor::new(nodes, resistance)))
                    }
                    BranchKind::CurrentSource { current } => {
                        Some(builder.add_current_source(CurrentSource::new(nodes, current)))
                    }
                    BranchKind::Capacitor { capacitance } => Some(
                        builder.add_capacitor(Capacitor::new(nodes, capacitance), branch.state()),
                    ),
                    BranchKind::Inductor { inductance } => Some(
                        builder.add_inductor(Inductor::new(nodes, inductance), branch.state()),
                    ),
                }
            })
            .collect();

        Ok((builder.build()?, mapping))
    }

    /// Write a solved step back onto the branches.
    ///
    /// `mapping` must come from the [`to_dynamic`](Self::to_dynamic) call
    /// that produced the solved snapshot. Branches left out of the solve get
    /// zero current and voltage. Battery nominal voltages are never changed.
    pub fn apply(&mut self, result: &CircuitResult, mapping: &[Option<ElementRef>]) {
        for (branch, element) in self.branches.iter_mut().zip(mapping) {
            match element {
                Some(element) => {
                    branch.current = result.time_average_current(*element);
                    branch.mna_current = result.instantaneous_current(*element);
                    branch.voltage_drop = result.voltage(*element);
                }
                None => branch.clear(),
            }
        }
    }
}
