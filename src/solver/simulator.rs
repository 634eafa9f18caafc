//! Main simulator interface.

use crate::circuit::{Circuit, NodeId};
use crate::error::Result;

use super::result::CircuitResult;
use super::subdivision::TimestepSubdivisions;
use super::{DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_DEPTH, DEFAULT_MIN_DT};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Largest accepted discrepancy in reactive currents (amperes).
    pub error_threshold: f64,
    /// Shortest sub-step the solver will subdivide to (seconds).
    pub min_dt: f64,
    /// Limit on nested halvings of one step.
    pub max_depth: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            min_dt: DEFAULT_MIN_DT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subdivision error threshold.
    ///
    /// Lower threshold = more sub-steps and more accuracy.
    /// - 1e-6 (default): accurate for classroom-scale RC/RL circuits
    /// - 1e-4: noticeably cheaper, slight lag on fast transients
    pub fn with_error_threshold(mut self, error_threshold: f64) -> Self {
        self.error_threshold = error_threshold;
        self
    }

    /// Set the minimum sub-step length (in seconds).
    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = min_dt;
        self
    }

    /// Set the recursion depth guard.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn subdivisions(&self) -> TimestepSubdivisions {
        TimestepSubdivisions::new(self.error_threshold, self.min_dt).with_max_depth(self.max_depth)
    }
}

/// Steps a caller-side [`Circuit`] through time.
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    /// Subdivision settings
    subdivisions: TimestepSubdivisions,
    /// Simulated time in seconds
    time: f64,
    /// Result of the most recent step
    last_result: Option<CircuitResult>,
}

impl Simulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Self {
        Self {
            circuit,
            subdivisions: config.subdivisions(),
            time: 0.0,
            last_result: None,
        }
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// On error the circuit keeps the results of the previous step.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        let (dynamic, mapping) = self.circuit.to_dynamic()?;
        let result = dynamic.solve_with_subdivisions(&self.subdivisions, dt)?;

        log::trace!(
            "t={:.6}: step of {:e}s took {} sub-steps",
            self.time,
            dt,
            result.num_steps()
        );
        if result.floor_hits() > 0 {
            log::debug!(
                "t={:.6}: {} interval(s) accepted at the subdivision floor",
                self.time,
                result.floor_hits()
            );
        }

        self.circuit.apply(&result, &mapping);
        self.time += dt;
        self.last_result = Some(result);
        Ok(())
    }

    /// Take `steps` steps of `dt` seconds each.
    pub fn run(&mut self, dt: f64, steps: usize) -> Result<()> {
        for _ in 0..steps {
            self.step(dt)?;
        }
        Ok(())
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Get the voltage at a node after the last step.
    ///
    /// `None` before the first step or for nodes outside the circuit.
    /// Internal companion nodes are not part of the circuit.
    pub fn node_voltage(&self, node: NodeId) -> Option<f64> {
        let result = self.last_result.as_ref()?;
        (node <= result.final_circuit().elements().max_node()).then(|| result.node_voltage(node))
    }

    /// Result of the most recent step.
    pub fn last_result(&self) -> Option<&CircuitResult> {
        self.last_result.as_ref()
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Get a mutable reference to the circuit, e.g. to flip a switch.
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Branch;
    use crate::error::CircuitError;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn n(i: usize) -> NodeId {
        NodeId(i)
    }

    fn rc_circuit() -> Circuit {
        let mut circuit = Circuit::new();
        circuit.add(Branch::battery("battery", [n(0), n(1)], 9.0, 1e-4));
        circuit.add(Branch::resistor("resistor", [n(1), n(2)], 10.0));
        circuit.add(Branch::switch("switch", [n(2), n(3)], 1e-4, true));
        circuit.add(Branch::capacitor("capacitor", [n(0), n(3)], 0.01));
        circuit
    }

    #[test]
    fn test_capacitor_charges_through_simulator() {
        let mut sim = Simulator::new(rc_circuit());
        let dt = 0.005;
        sim.run(dt, 40).unwrap();
        assert_relative_eq!(sim.time(), 0.2, epsilon = 1e-12);

        let tau = (10.0 + 2e-4) * 0.01;
        let expected = 9.0 * (1.0 - (-0.2f64 / tau).exp());
        let capacitor = sim.circuit().find("capacitor").unwrap();
        assert_abs_diff_eq!(capacitor.voltage_drop, expected, epsilon = 1e-3);
        assert_abs_diff_eq!(sim.node_voltage(n(3)).unwrap(), expected, epsilon = 1e-3);

        // Series loop: battery and resistor see the charging current
        let battery = sim.circuit().find("battery").unwrap();
        let resistor = sim.circuit().find("resistor").unwrap();
        assert_relative_eq!(battery.mna_current, resistor.mna_current, epsilon = 1e-9);
        assert_relative_eq!(-capacitor.mna_current, resistor.mna_current, epsilon = 1e-9);
        assert!(battery.current > battery.mna_current);
    }

    #[test]
    fn test_battery_nominal_voltage_is_preserved() {
        let mut sim = Simulator::new(rc_circuit());
        sim.step(0.01).unwrap();
        let battery = sim.circuit().find("battery").unwrap();
        assert_eq!(
            battery.kind,
            crate::circuit::BranchKind::Battery {
                voltage: 9.0,
                internal_resistance: 1e-4
            }
        );
    }

    #[test]
    fn test_open_switch_is_zeroed_and_isolates_capacitor() {
        let mut sim = Simulator::new(rc_circuit());
        sim.run(0.01, 5).unwrap();
        assert!(sim.circuit().find("capacitor").unwrap().voltage_drop > 1.0);

        // Opening the switch leaves node 3 connected only to the capacitor,
        // which still closes a path to ground through its companion.
        for branch in &mut sim.circuit_mut().branches {
            if branch.name == "switch" {
                branch.kind = crate::circuit::BranchKind::Switch {
                    resistance: 1e-4,
                    closed: false,
                };
            }
        }
        sim.step(0.01).unwrap();
        let held = sim.circuit().find("capacitor").unwrap().voltage_drop;
        sim.run(0.01, 4).unwrap();

        let switch = sim.circuit().find("switch").unwrap();
        assert_eq!((switch.current, switch.mna_current, switch.voltage_drop), (0.0, 0.0, 0.0));

        // No loop, no current: the capacitor holds its charge
        let capacitor = sim.circuit().find("capacitor").unwrap();
        assert_abs_diff_eq!(capacitor.mna_current, 0.0, epsilon = 1e-12);
        assert_relative_eq!(capacitor.voltage_drop, held, epsilon = 1e-9);
        assert!(held > 1.0);
    }

    #[test]
    fn test_inductor_energizes_through_simulator() {
        let mut circuit = Circuit::new();
        circuit.add(Branch::battery("battery", [n(0), n(1)], 5.0, 0.0));
        circuit.add(Branch::resistor("resistor", [n(1), n(2)], 10.0));
        circuit.add(Branch::inductor("inductor", [n(2), n(0)], 1.0));

        let mut sim = Simulator::new(circuit);
        sim.run(0.01, 30).unwrap();

        let expected = 0.5 * (1.0 - (-0.3f64 * 10.0).exp());
        let inductor = sim.circuit().find("inductor").unwrap();
        assert_abs_diff_eq!(inductor.mna_current, expected, epsilon = 1e-3);
        // Still rising, so the step average lags the end-of-step value
        assert!(inductor.current < inductor.mna_current);
    }

    #[test]
    fn test_current_source_branch() {
        let mut circuit = Circuit::new();
        circuit.add(Branch::current_source("source", [n(0), n(1)], 0.2));
        circuit.add(Branch::resistor("load", [n(1), n(0)], 50.0));

        let mut sim = Simulator::new(circuit);
        sim.step(0.01).unwrap();
        assert_relative_eq!(sim.node_voltage(n(1)).unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(sim.circuit().find("load").unwrap().current, 0.2, epsilon = 1e-9);
        assert_eq!(sim.node_voltage(n(9)), None);
    }

    #[test]
    fn test_node_voltage_hides_internal_nodes() {
        let mut circuit = Circuit::new();
        circuit.add(Branch::battery("battery", [n(0), n(1)], 9.0, 0.5));
        circuit.add(Branch::capacitor("capacitor", [n(1), n(0)], 0.01));

        let mut sim = Simulator::new(circuit);
        sim.step(0.01).unwrap();

        // Nodes 2 and 3 exist only inside the companion circuit
        assert!(sim.last_result().unwrap().final_solution().mna_solution().num_nodes() > 3);
        assert_eq!(sim.node_voltage(n(2)), None);
        assert_eq!(sim.node_voltage(n(3)), None);
        assert_eq!(sim.node_voltage(NodeId::GROUND), Some(0.0));
        let capacitor = sim.circuit().find("capacitor").unwrap();
        assert_relative_eq!(
            sim.node_voltage(n(1)).unwrap(),
            -capacitor.voltage_drop,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_failed_step_keeps_previous_results() {
        let mut circuit = Circuit::new();
        circuit.add(Branch::battery("a", [n(0), n(1)], 5.0, 0.0));
        circuit.add(Branch::battery("b", [n(0), n(1)], 3.0, 0.0));

        let mut sim = Simulator::with_config(circuit, SimulatorConfig::new().with_min_dt(1e-6));
        assert_eq!(sim.step(0.01), Err(CircuitError::SingularMatrix));
        assert_eq!(sim.time(), 0.0);
        assert!(sim.last_result().is_none());
        assert_eq!(sim.node_voltage(n(1)), None);
    }
}
