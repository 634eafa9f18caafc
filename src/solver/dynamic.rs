//! Dynamic circuit snapshots.
//!
//! A [`DynamicCircuit`] is an immutable value: solving it never mutates it,
//! and applying a solution produces a new snapshot that shares the element
//! definitions with its predecessor and only carries fresh reactive states.

use std::sync::Arc;

use crate::circuit::{validate_circuit, validate_time_step, ElementRef, NodeId};
use crate::components::{
    Battery, Capacitor, CurrentSource, ElementState, Inductor, ResistiveBattery, Resistor,
    TwoTerminal,
};
use crate::error::Result;

use super::companion::{to_mna_circuit, CompanionProbes};
use super::mna::Solution;
use super::result::CircuitResult;
use super::subdivision::{Steppable, TimestepSubdivisions};

/// Element definitions of a circuit, without any per-step state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Elements {
    pub batteries: Vec<Battery>,
    pub resistors: Vec<Resistor>,
    pub current_sources: Vec<CurrentSource>,
    pub resistive_batteries: Vec<ResistiveBattery>,
    pub capacitors: Vec<Capacitor>,
    pub inductors: Vec<Inductor>,
}

impl Elements {
    /// Terminal nodes of an element.
    pub fn nodes(&self, element: ElementRef) -> [NodeId; 2] {
        match element {
            ElementRef::Battery(i) => self.batteries[i].nodes,
            ElementRef::Resistor(i) => self.resistors[i].nodes,
            ElementRef::CurrentSource(i) => self.current_sources[i].nodes,
            ElementRef::ResistiveBattery(i) => self.resistive_batteries[i].nodes,
            ElementRef::Capacitor(i) => self.capacitors[i].nodes,
            ElementRef::Inductor(i) => self.inductors[i].nodes,
        }
    }

    /// Highest node index referenced by any element.
    pub fn max_node(&self) -> NodeId {
        self.batteries
            .iter()
            .map(TwoTerminal::max_node)
            .chain(self.resistors.iter().map(TwoTerminal::max_node))
            .chain(self.current_sources.iter().map(TwoTerminal::max_node))
            .chain(self.resistive_batteries.iter().map(TwoTerminal::max_node))
            .chain(self.capacitors.iter().map(TwoTerminal::max_node))
            .chain(self.inductors.iter().map(TwoTerminal::max_node))
            .max()
            .unwrap_or(NodeId::GROUND)
    }
}

/// Builder for a [`DynamicCircuit`].
///
/// Handles returned by the `add_*` methods (or implied by insertion order
/// when chaining) stay valid for every snapshot derived from the result.
#[derive(Debug, Default)]
pub struct CircuitBuilder {
    elements: Elements,
    capacitor_states: Vec<ElementState>,
    inductor_states: Vec<ElementState>,
}

impl CircuitBuilder {
    pub fn add_battery(&mut self, battery: Battery) -> ElementRef {
        self.elements.batteries.push(battery);
        ElementRef::Battery(self.elements.batteries.len() - 1)
    }

    pub fn add_resistor(&mut self, resistor: Resistor) -> ElementRef {
        self.elements.resistors.push(resistor);
        ElementRef::Resistor(self.elements.resistors.len() - 1)
    }

    pub fn add_current_source(&mut self, source: CurrentSource) -> ElementRef {
        self.elements.current_sources.push(source);
        ElementRef::CurrentSource(self.elements.current_sources.len() - 1)
    }

    pub fn add_resistive_battery(&mut self, battery: ResistiveBattery) -> ElementRef {
        self.elements.resistive_batteries.push(battery);
        ElementRef::ResistiveBattery(self.elements.resistive_batteries.len() - 1)
    }

    pub fn add_capacitor(&mut self, capacitor: Capacitor, state: ElementState) -> ElementRef {
        self.elements.capacitors.push(capacitor);
        self.capacitor_states.push(state);
        ElementRef::Capacitor(self.elements.capacitors.len() - 1)
    }

    pub fn add_inductor(&mut self, inductor: Inductor, state: ElementState) -> ElementRef {
        self.elements.inductors.push(inductor);
        self.inductor_states.push(state);
        ElementRef::Inductor(self.elements.inductors.len() - 1)
    }

    pub fn battery(mut self, battery: Battery) -> Self {
        self.add_battery(battery);
        self
    }

    pub fn resistor(mut self, resistor: Resistor) -> Self {
        self.add_resistor(resistor);
        self
    }

    pub fn current_source(mut self, source: CurrentSource) -> Self {
        self.add_current_source(source);
        self
    }

    pub fn resistive_battery(mut self, battery: ResistiveBattery) -> Self {
        self.add_resistive_battery(battery);
        self
    }

    pub fn capacitor(mut self, capacitor: Capacitor, state: ElementState) -> Self {
        self.add_capacitor(capacitor, state);
        self
    }

    pub fn inductor(mut self, inductor: Inductor, state: ElementState) -> Self {
        self.add_inductor(inductor, state);
        self
    }

    /// Validate element parameters and freeze the circuit.
    pub fn build(self) -> Result<DynamicCircuit> {
        let circuit = DynamicCircuit {
            elements: Arc::new(self.elements),
            capacitor_states: self.capacitor_states,
            inductor_states: self.inductor_states,
        };
        validate_circuit(&circuit)?;
        Ok(circuit)
    }
}

/// An immutable snapshot of a circuit and the states of its reactive elements.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicCircuit {
    elements: Arc<Elements>,
    capacitor_states: Vec<ElementState>,
    inductor_states: Vec<ElementState>,
}

impl DynamicCircuit {
    /// Start building a circuit.
    pub fn builder() -> CircuitBuilder {
        CircuitBuilder::default()
    }

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn capacitor_states(&self) -> &[ElementState] {
        &self.capacitor_states
    }

    pub fn inductor_states(&self) -> &[ElementState] {
        &self.inductor_states
    }

    pub fn capacitor_state(&self, index: usize) -> ElementState {
        self.capacitor_states[index]
    }

    pub fn inductor_state(&self, index: usize) -> ElementState {
        self.inductor_states[index]
    }

    /// Currents of all capacitors followed by all inductors.
    pub fn reactive_currents(&self) -> Vec<f64> {
        self.capacitor_states
            .iter()
            .chain(&self.inductor_states)
            .map(|s| s.current)
            .collect()
    }

    /// Solve the companion model for a step of length `dt`.
    ///
    /// Solving the companion model is the same as propagating forward in
    /// time by `dt`; the circuit itself is left untouched.
    pub fn solve_propagate(&self, dt: f64) -> Result<DynamicSolution> {
        validate_time_step(dt)?;
        let companion = to_mna_circuit(self, dt);
        let solution = companion.linear.solve()?;
        Ok(DynamicSolution {
            elements: Arc::clone(&self.elements),
            solution,
            probes: companion.probes,
        })
    }

    /// Derive the next snapshot by reading reactive states out of `solution`.
    pub fn update_circuit(&self, solution: &DynamicSolution) -> DynamicCircuit {
        let read = |element: ElementRef| {
            ElementState::new(solution.voltage(element), solution.current(element))
        };
        DynamicCircuit {
            elements: Arc::clone(&self.elements),
            capacitor_states: (0..self.capacitor_states.len())
                .map(|i| read(ElementRef::Capacitor(i)))
                .collect(),
            inductor_states: (0..self.inductor_states.len())
                .map(|i| read(ElementRef::Inductor(i)))
                .collect(),
        }
    }

    /// One companion solve of length `dt` followed by a state update.
    pub fn update(&self, dt: f64) -> Result<DynamicCircuit> {
        Ok(self.update_circuit(&self.solve_propagate(dt)?))
    }

    /// Advance by `dt`, subdividing adaptively to bound the local error.
    pub fn solve_with_subdivisions(
        &self,
        subdivisions: &TimestepSubdivisions,
        dt: f64,
    ) -> Result<CircuitResult> {
        validate_time_step(dt)?;
        let steps = subdivisions.step_in_time(DynamicState::new(self.clone()), &CompanionStepper, dt)?;
        CircuitResult::from_result_set(steps)
    }

    /// Like [`solve_with_subdivisions`](Self::solve_with_subdivisions), keeping only the final snapshot.
    pub fn update_with_subdivisions(
        &self,
        subdivisions: &TimestepSubdivisions,
        dt: f64,
    ) -> Result<DynamicCircuit> {
        Ok(self.solve_with_subdivisions(subdivisions, dt)?.into_final_circuit())
    }
}

/// The solution of one companion-model solve.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSolution {
    elements: Arc<Elements>,
    solution: Solution,
    probes: CompanionProbes,
}

impl DynamicSolution {
    /// The underlying linear solution, internal companion nodes included.
    pub fn mna_solution(&self) -> &Solution {
        &self.solution
    }

    pub fn node_voltage(&self, node: NodeId) -> f64 {
        self.solution.node_voltage(node)
    }

    /// Current through `element`, flowing from its node0 to its node1.
    pub fn current(&self, element: ElementRef) -> f64 {
        self.probes.probe(&self.elements, element).read(&self.solution)
    }

    /// `V(node1) - V(node0)` across `element`.
    pub fn voltage(&self, element: ElementRef) -> f64 {
        self.solution.voltage_across(self.elements.nodes(element))
    }
}

/// A snapshot paired with the solution that produced it.
///
/// The initial state of a stepping run has no solution yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicState {
    pub circuit: DynamicCircuit,
    pub solution: Option<DynamicSolution>,
}

impl DynamicState {
    pub fn new(circuit: DynamicCircuit) -> Self {
        Self {
            circuit,
            solution: None,
        }
    }

    /// Solve one step of length `dt` and apply it.
    pub fn update(&self, dt: f64) -> Result<DynamicState> {
        let solution = self.circuit.solve_propagate(dt)?;
        let circuit = self.circuit.update_circuit(&solution);
        Ok(DynamicState {
            circuit,
            solution: Some(solution),
        })
    }
}

/// Steps dynamic states; two states are as far apart as their reactive
/// currents are.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompanionStepper;

impl Steppable<DynamicState> for CompanionStepper {
    fn update(&self, state: &DynamicState, dt: f64) -> Result<DynamicState> {
        state.update(dt)
    }

    fn distance(&self, a: &DynamicState, b: &DynamicState) -> f64 {
        euclidean_distance(&a.circuit.reactive_currents(), &b.circuit.reactive_currents())
    }
}

/// Euclidean distance between two equally long vectors.
pub fn euclidean_distance(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "vector length mismatch");
    x.iter()
        .zip(y)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}
