//! Results of a subdivided time step.

use crate::circuit::{ElementRef, NodeId};
use crate::error::{CircuitError, Result};

use super::dynamic::{DynamicCircuit, DynamicSolution, DynamicState};
use super::subdivision::ResultSet;

/// One accepted sub-step: its solution and how long it lasted.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedStep {
    pub solution: DynamicSolution,
    pub dt: f64,
}

/// Every accepted sub-step of one external time step, plus the snapshot
/// the step ended in.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitResult {
    /// All sub-steps except the final one, in order.
    history: Vec<SolvedStep>,
    last: SolvedStep,
    final_circuit: DynamicCircuit,
    floor_hits: usize,
}

impl CircuitResult {
    /// Collect the solved sub-steps of a subdivision run.
    pub fn from_result_set(result_set: ResultSet<DynamicState>) -> Result<Self> {
        let floor_hits = result_set.floor_hits();
        let mut history = Vec::with_capacity(result_set.len());
        let mut final_circuit = None;

        for step in result_set.into_steps() {
            let DynamicState { circuit, solution } = step.state;
            if let Some(solution) = solution {
                history.push(SolvedStep {
                    solution,
                    dt: step.dt,
                });
            }
            final_circuit = Some(circuit);
        }

        match (history.pop(), final_circuit) {
            (Some(last), Some(final_circuit)) => Ok(Self {
                history,
                last,
                final_circuit,
                floor_hits,
            }),
            _ => Err(CircuitError::invalid_simulation_param(
                "time step produced no solved sub-steps",
            )),
        }
    }

    /// All accepted sub-steps, in order.
    pub fn steps(&self) -> impl Iterator<Item = &SolvedStep> {
        self.history.iter().chain(std::iter::once(&self.last))
    }

    pub fn num_steps(&self) -> usize {
        self.history.len() + 1
    }

    /// Total time covered by the sub-steps.
    pub fn total_time(&self) -> f64 {
        self.steps().map(|s| s.dt).sum()
    }

    /// Intervals accepted above the error threshold (see [`ResultSet::floor_hits`]).
    pub fn floor_hits(&self) -> usize {
        self.floor_hits
    }

    pub fn final_solution(&self) -> &DynamicSolution {
        &self.last.solution
    }

    pub fn final_circuit(&self) -> &DynamicCircuit {
        &self.final_circuit
    }

    pub fn into_final_circuit(self) -> DynamicCircuit {
        self.final_circuit
    }

    /// Current through `element` at the end of the step.
    pub fn instantaneous_current(&self, element: ElementRef) -> f64 {
        self.last.solution.current(element)
    }

    /// Current through `element` averaged over the step, weighted by sub-step length.
    pub fn time_average_current(&self, element: ElementRef) -> f64 {
        let weighted: f64 = self
            .steps()
            .map(|s| s.solution.current(element) * s.dt)
            .sum();
        weighted / self.total_time()
    }

    /// `V(node1) - V(node0)` across `element` at the end of the step.
    pub fn voltage(&self, element: ElementRef) -> f64 {
        self.last.solution.voltage(element)
    }

    /// Voltage at `node` at the end of the step.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        self.last.solution.node_voltage(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Battery, Capacitor, ElementState, Resistor};
    use crate::solver::TimestepSubdivisions;
    use approx::assert_relative_eq;

    fn n(i: usize) -> NodeId {
        NodeId(i)
    }

    #[test]
    fn test_dc_circuit_average_equals_instantaneous() {
        let mut builder = DynamicCircuit::builder();
        let battery = builder.add_battery(Battery::new([n(0), n(1)], 6.0));
        let resistor = builder.add_resistor(Resistor::new([n(1), n(0)], 3.0));
        let circuit = builder.build().unwrap();

        let result = circuit
            .solve_with_subdivisions(&TimestepSubdivisions::default(), 0.05)
            .unwrap();

        assert_eq!(result.num_steps(), 2);
        assert_relative_eq!(result.total_time(), 0.05);
        assert_relative_eq!(result.instantaneous_current(battery), 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.time_average_current(battery), 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.time_average_current(resistor), 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.voltage(resistor), -6.0, epsilon = 1e-12);
        assert_relative_eq!(result.node_voltage(n(1)), 6.0, epsilon = 1e-12);
        assert_eq!(result.node_voltage(NodeId::GROUND), 0.0);
    }

    #[test]
    fn test_time_average_is_dt_weighted() {
        let mut builder = DynamicCircuit::builder();
        builder.add_battery(Battery::new([n(0), n(1)], 9.0));
        builder.add_resistor(Resistor::new([n(1), n(2)], 1.0));
        let capacitor = builder.add_capacitor(
            Capacitor::new([n(0), n(2)], 0.1),
            ElementState::new(0.0, -9.0),
        );
        let circuit = builder.build().unwrap();

        let result = circuit
            .solve_with_subdivisions(&TimestepSubdivisions::default(), 0.03)
            .unwrap();

        let mut weighted = 0.0;
        let mut total = 0.0;
        for step in result.steps() {
            weighted += step.solution.current(capacitor) * step.dt;
            total += step.dt;
        }
        assert_relative_eq!(result.time_average_current(capacitor), weighted / total);
        assert_relative_eq!(total, 0.03, epsilon = 1e-15);

        // A decaying charging current averages to more (in magnitude) than its final value
        assert!(result.time_average_current(capacitor) < result.instantaneous_current(capacitor));
        assert_relative_eq!(
            result.final_circuit().capacitor_state(0).current,
            result.instantaneous_current(capacitor)
        );
        assert_relative_eq!(
            result.final_circuit().capacitor_state(0).voltage,
            result.voltage(capacitor)
        );
    }
}
