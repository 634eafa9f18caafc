//! MNA matrix assembly and solving for purely linear circuits.

use crate::circuit::{validate_connectivity, BranchId, NodeId};
use crate::components::{Battery, CurrentSource, Resistor, TwoTerminal};
use crate::error::{CircuitError, Result};

use super::MIN_PIVOT;

/// MNA matrix system Ax = z.
#[derive(Debug)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    pub lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pub pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a new, zeroed MNA system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a battery from n0 to n1 whose branch current lives at index br.
    ///
    /// The branch current flows through the battery from n0 to n1, so it
    /// leaves n0 and enters n1. The extra row enforces V[n1] - V[n0] = E.
    pub fn stamp_battery(&mut self, n0: Option<usize>, n1: Option<usize>, br: usize, voltage: f64) {
        if let Some(i) = n0 {
            self.add(i, br, 1.0);
            self.add(br, i, -1.0);
        }
        if let Some(j) = n1 {
            self.add(j, br, -1.0);
            self.add(br, j, 1.0);
        }
        self.z[br] = voltage;
    }

    /// Stamp a current source driving `current` through itself from n0 to n1.
    pub fn stamp_current_source(&mut self, n0: Option<usize>, n1: Option<usize>, current: f64) {
        // Current leaves n0 and enters n1
        if let Some(i) = n0 {
            self.add_source(i, -current);
        }
        if let Some(j) = n1 {
            self.add_source(j, current);
        }
    }

    /// Replace a row with the equation x[row] = 0.
    pub fn pin_to_zero(&mut self, row: usize) {
        let n = self.size;
        self.a[row * n..(row + 1) * n].fill(0.0);
        self.a[row * n + row] = 1.0;
        self.z[row] = 0.0;
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        // Pivot threshold is relative to the largest entry
        let scale = self.a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let threshold = MIN_PIVOT * scale;

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val <= threshold {
                return Err(CircuitError::SingularMatrix);
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            let diag = self.lu[i * n + i];
            if diag == 0.0 {
                return Err(CircuitError::SingularMatrix);
            }
            self.x[i] /= diag;
        }

        if let Some(index) = self.x.iter().position(|v| !v.is_finite()) {
            return Err(CircuitError::NonFiniteSolution { index });
        }

        Ok(())
    }
}

/// Get the matrix index for a node voltage.
/// Returns None for ground (node 0), which is not an unknown.
pub fn node_index(node: NodeId) -> Option<usize> {
    if node.is_ground() {
        None
    } else {
        Some(node.0 - 1)
    }
}

/// A circuit made only of ideal batteries, resistors and current sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearCircuit {
    pub batteries: Vec<Battery>,
    pub resistors: Vec<Resistor>,
    pub current_sources: Vec<CurrentSource>,
}

impl LinearCircuit {
    /// Create a linear circuit from its element lists.
    pub fn new(
        batteries: Vec<Battery>,
        resistors: Vec<Resistor>,
        current_sources: Vec<CurrentSource>,
    ) -> Self {
        Self {
            batteries,
            resistors,
            current_sources,
        }
    }

    /// Size of the node index space, ground included.
    pub fn num_nodes(&self) -> usize {
        let max = self
            .batteries
            .iter()
            .map(TwoTerminal::max_node)
            .chain(self.resistors.iter().map(TwoTerminal::max_node))
            .chain(self.current_sources.iter().map(TwoTerminal::max_node))
            .max()
            .unwrap_or(NodeId::GROUND);
        max.0 + 1
    }

    /// Get the total size of the MNA solution vector.
    pub fn matrix_size(&self) -> usize {
        // Nodes (excluding ground) + battery currents
        (self.num_nodes() - 1) + self.batteries.len()
    }

    /// Whether each node index is touched by at least one element.
    pub fn used_nodes(&self) -> Vec<bool> {
        let mut used = vec![false; self.num_nodes()];
        let terminals = self
            .batteries
            .iter()
            .map(TwoTerminal::nodes)
            .chain(self.resistors.iter().map(TwoTerminal::nodes))
            .chain(self.current_sources.iter().map(TwoTerminal::nodes));
        for [a, b] in terminals {
            used[a.0] = true;
            used[b.0] = true;
        }
        used
    }

    /// Assemble the MNA system without solving it.
    pub fn assemble(&self) -> MnaMatrix {
        let num_nodes = self.num_nodes();
        let mut matrix = MnaMatrix::new(self.matrix_size());

        for r in &self.resistors {
            matrix.stamp_conductance(node_index(r.nodes[0]), node_index(r.nodes[1]), r.conductance());
        }

        for (k, b) in self.batteries.iter().enumerate() {
            let br = (num_nodes - 1) + k;
            matrix.stamp_battery(node_index(b.nodes[0]), node_index(b.nodes[1]), br, b.voltage);
        }

        for s in &self.current_sources {
            matrix.stamp_current_source(node_index(s.nodes[0]), node_index(s.nodes[1]), s.current);
        }

        // Node indices nobody connects to would leave empty rows behind
        for (node, used) in self.used_nodes().into_iter().enumerate() {
            if !used {
                if let Some(row) = node_index(NodeId(node)) {
                    matrix.pin_to_zero(row);
                }
            }
        }

        matrix
    }

    /// Solve for all node voltages and battery currents.
    pub fn solve(&self) -> Result<Solution> {
        validate_connectivity(self)?;

        let mut matrix = self.assemble();
        matrix.factor()?;
        matrix.solve()?;

        Ok(Solution {
            x: matrix.x,
            num_nodes: self.num_nodes(),
        })
    }

    /// Net current leaving each node through its elements.
    ///
    /// Every entry is zero (to rounding) for a valid solution of this circuit.
    pub fn kcl_residuals(&self, solution: &Solution) -> Vec<f64> {
        let mut residual = vec![0.0; self.num_nodes()];
        let mut leave = |nodes: [NodeId; 2], current: f64| {
            residual[nodes[0].0] += current;
            residual[nodes[1].0] -= current;
        };
        for (k, b) in self.batteries.iter().enumerate() {
            leave(b.nodes, solution.battery_current(BranchId(k)));
        }
        for r in &self.resistors {
            let current = r.current(
                solution.node_voltage(r.nodes[0]),
                solution.node_voltage(r.nodes[1]),
            );
            leave(r.nodes, current);
        }
        for s in &self.current_sources {
            leave(s.nodes, s.current);
        }
        residual
    }
}

/// Solved node voltages and battery branch currents.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    x: Vec<f64>,
    num_nodes: usize,
}

impl Solution {
    /// Size of the node index space, ground included.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Get the voltage at a node. Ground is exactly zero.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        assert!(
            node.0 < self.num_nodes,
            "node {} is outside the solved circuit ({} nodes)",
            node,
            self.num_nodes
        );
        match node_index(node) {
            Some(i) => self.x[i],
            None => 0.0,
        }
    }

    /// `V(node1) - V(node0)`.
    pub fn voltage_across(&self, nodes: [NodeId; 2]) -> f64 {
        self.node_voltage(nodes[1]) - self.node_voltage(nodes[0])
    }

    /// Current through battery `branch`, flowing from its node0 to its node1.
    pub fn battery_current(&self, branch: BranchId) -> f64 {
        self.x[(self.num_nodes - 1) + branch.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn n(i: usize) -> NodeId {
        NodeId(i)
    }

    #[test]
    fn test_voltage_divider() {
        let circuit = LinearCircuit::new(
            vec![Battery::new([n(0), n(1)], 10.0)],
            vec![
                Resistor::new([n(1), n(2)], 1000.0),
                Resistor::new([n(2), n(0)], 1000.0),
            ],
            vec![],
        );
        let solution = circuit.solve().unwrap();

        assert_relative_eq!(solution.node_voltage(n(1)), 10.0, epsilon = 1e-12);
        assert_relative_eq!(solution.node_voltage(n(2)), 5.0, epsilon = 1e-12);
        // 5mA flows out of the battery's node1 terminal, i.e. node0 -> node1 inside it
        assert_relative_eq!(solution.battery_current(BranchId(0)), 0.005, epsilon = 1e-12);
        assert_relative_eq!(solution.voltage_across([n(0), n(1)]), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_current_source_sign_convention() {
        // 2A driven from ground to node 1 through the source, into a 3 ohm load
        let circuit = LinearCircuit::new(
            vec![],
            vec![Resistor::new([n(1), n(0)], 3.0)],
            vec![CurrentSource::new([n(0), n(1)], 2.0)],
        );
        let solution = circuit.solve().unwrap();
        assert_relative_eq!(solution.node_voltage(n(1)), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_high_impedance_circuit_is_not_singular() {
        // 1mA into 10 petaohm: every matrix entry is tiny, none is zero
        let circuit = LinearCircuit::new(
            vec![],
            vec![Resistor::new([n(1), n(0)], 1e16)],
            vec![CurrentSource::new([n(0), n(1)], 1e-3)],
        );
        let solution = circuit.solve().unwrap();
        assert_relative_eq!(solution.node_voltage(n(1)), 1e13, max_relative = 1e-12);
    }

    #[test]
    fn test_pivot_threshold_scales_with_matrix() {
        let mut matrix = MnaMatrix::new(2);
        matrix.add(0, 0, 1e-20);
        matrix.add(1, 1, 1e-20);
        assert!(matrix.factor().is_ok());

        // A dependent row is still rejected once scaled down
        let mut matrix = MnaMatrix::new(2);
        for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            matrix.add(row, col, 1e-20);
        }
        assert_eq!(matrix.factor(), Err(CircuitError::SingularMatrix));
    }

    #[test]
    fn test_ground_is_exactly_zero() {
        let circuit = LinearCircuit::new(
            vec![Battery::new([n(2), n(1)], 3.3)],
            vec![
                Resistor::new([n(1), n(0)], 47.0),
                Resistor::new([n(2), n(0)], 22.0),
            ],
            vec![CurrentSource::new([n(1), n(2)], 0.1)],
        );
        let solution = circuit.solve().unwrap();
        assert_eq!(solution.node_voltage(NodeId::GROUND), 0.0);
    }

    #[test]
    fn test_kcl_holds_at_every_node() {
        let circuit = LinearCircuit::new(
            vec![
                Battery::new([n(0), n(1)], 9.0),
                Battery::new([n(3), n(4)], 1.5),
            ],
            vec![
                Resistor::new([n(1), n(2)], 10.0),
                Resistor::new([n(2), n(0)], 20.0),
                Resistor::new([n(2), n(3)], 5.0),
                Resistor::new([n(4), n(0)], 7.5),
            ],
            vec![CurrentSource::new([n(0), n(3)], 0.25)],
        );
        let solution = circuit.solve().unwrap();

        for residual in circuit.kcl_residuals(&solution) {
            assert_abs_diff_eq!(residual, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_conflicting_batteries_are_singular() {
        let circuit = LinearCircuit::new(
            vec![
                Battery::new([n(0), n(1)], 5.0),
                Battery::new([n(0), n(1)], 3.0),
            ],
            vec![Resistor::new([n(1), n(0)], 100.0)],
            vec![],
        );
        assert_eq!(circuit.solve(), Err(CircuitError::SingularMatrix));
    }

    #[test]
    fn test_floating_node_is_reported() {
        let circuit = LinearCircuit::new(
            vec![Battery::new([n(0), n(1)], 5.0)],
            vec![
                Resistor::new([n(1), n(0)], 100.0),
                Resistor::new([n(2), n(3)], 100.0),
            ],
            vec![],
        );
        assert!(matches!(circuit.solve(), Err(CircuitError::FloatingNode { .. })));
    }

    #[test]
    fn test_unused_node_indices_are_pinned() {
        // Nodes 1 and 2 are never mentioned
        let circuit = LinearCircuit::new(
            vec![Battery::new([n(0), n(3)], 2.0)],
            vec![Resistor::new([n(3), n(0)], 4.0)],
            vec![],
        );
        let solution = circuit.solve().unwrap();
        assert_eq!(solution.num_nodes(), 4);
        assert_eq!(solution.node_voltage(n(1)), 0.0);
        assert_relative_eq!(solution.node_voltage(n(3)), 2.0, epsilon = 1e-12);
        assert_relative_eq!(solution.battery_current(BranchId(0)), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_stamp_battery_layout() {
        let circuit = LinearCircuit::new(vec![Battery::new([n(1), n(2)], 1.0)], vec![], vec![]);
        let matrix = circuit.assemble();
        // Unknowns: V1, V2, I0
        assert_eq!(matrix.size, 3);
        assert_eq!(matrix.get(0, 2), 1.0);
        assert_eq!(matrix.get(1, 2), -1.0);
        assert_eq!(matrix.get(2, 0), -1.0);
        assert_eq!(matrix.get(2, 1), 1.0);
        assert_eq!(matrix.z[2], 1.0);
    }

    #[test]
    #[should_panic]
    fn test_node_outside_solution_panics() {
        let circuit = LinearCircuit::new(
            vec![Battery::new([n(0), n(1)], 1.0)],
            vec![Resistor::new([n(1), n(0)], 1.0)],
            vec![],
        );
        let solution = circuit.solve().unwrap();
        solution.node_voltage(n(7));
    }
}
