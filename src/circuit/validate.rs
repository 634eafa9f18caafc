//! Circuit validation.
//!
//! Turns conditions that would otherwise surface as an opaque singular
//! matrix (or silently produce NaN) into actionable errors.

use crate::circuit::{ElementRef, NodeId};
use crate::components::TwoTerminal;
use crate::error::{CircuitError, Result};
use crate::solver::{DynamicCircuit, LinearCircuit};

/// Validate element parameters and reactive states of a dynamic circuit.
///
/// Checks:
/// - Resistances, capacitances and inductances are finite and positive
/// - Source values and reactive states are finite
pub fn validate_circuit(circuit: &DynamicCircuit) -> Result<()> {
    let elements = circuit.elements();

    for (i, b) in elements.batteries.iter().enumerate() {
        finite(ElementRef::Battery(i), "voltage", b.voltage)?;
    }
    for (i, r) in elements.resistors.iter().enumerate() {
        positive(ElementRef::Resistor(i), "resistance", r.resistance)?;
    }
    for (i, s) in elements.current_sources.iter().enumerate() {
        finite(ElementRef::CurrentSource(i), "current", s.current)?;
    }
    for (i, b) in elements.resistive_batteries.iter().enumerate() {
        finite(ElementRef::ResistiveBattery(i), "voltage", b.voltage)?;
        positive(ElementRef::ResistiveBattery(i), "resistance", b.resistance)?;
    }
    for (i, (c, state)) in elements
        .capacitors
        .iter()
        .zip(circuit.capacitor_states())
        .enumerate()
    {
        let element = ElementRef::Capacitor(i);
        positive(element, "capacitance", c.capacitance)?;
        finite(element, "voltage", state.voltage)?;
        finite(element, "current", state.current)?;
    }
    for (i, (l, state)) in elements
        .inductors
        .iter()
        .zip(circuit.inductor_states())
        .enumerate()
    {
        let element = ElementRef::Inductor(i);
        positive(element, "inductance", l.inductance)?;
        finite(element, "voltage", state.voltage)?;
        finite(element, "current", state.current)?;
    }

    Ok(())
}

/// Validate a time step length.
pub fn validate_time_step(dt: f64) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(CircuitError::invalid_simulation_param(format!(
            "time step must be positive and finite, got {}",
            dt
        )));
    }
    Ok(())
}

/// Check that every node with at least one element has a path to ground.
///
/// Only batteries and resistors conduct for this purpose; a node reached
/// solely through current sources has no defined voltage.
pub fn validate_connectivity(circuit: &LinearCircuit) -> Result<()> {
    let used = circuit.used_nodes();
    let mut sets = DisjointSets::new(used.len());

    let conducting = circuit
        .batteries
        .iter()
        .map(TwoTerminal::nodes)
        .chain(circuit.resistors.iter().map(TwoTerminal::nodes));
    for [a, b] in conducting {
        sets.union(a.0, b.0);
    }

    let ground = sets.find(NodeId::GROUND.0);
    for (node, _) in used.iter().enumerate().filter(|(_, used)| **used) {
        if sets.find(node) != ground {
            return Err(CircuitError::FloatingNode {
                node: NodeId(node).to_string(),
            });
        }
    }

    Ok(())
}

fn finite(element: ElementRef, param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CircuitError::invalid_parameter(
            element.to_string(),
            param,
            format!("must be finite, got {}", value),
        ))
    }
}

fn positive(element: ElementRef, param: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CircuitError::invalid_parameter(
            element.to_string(),
            param,
            format!("must be positive and finite, got {}", value),
        ))
    }
}

/// Union-find over node indices.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Battery, Capacitor, CurrentSource, ElementState, Resistor};

    #[test]
    fn test_rejects_bad_time_steps() {
        assert!(validate_time_step(1e-3).is_ok());
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                validate_time_step(dt),
                Err(CircuitError::InvalidSimulationParam { .. })
            ));
        }
    }

    #[test]
    fn test_node_fed_only_by_current_source_is_floating() {
        let circuit = LinearCircuit::new(
            vec![],
            vec![Resistor::new([NodeId(1), NodeId(0)], 10.0)],
            vec![CurrentSource::new([NodeId(1), NodeId(2)], 1.0)],
        );
        assert_eq!(
            validate_connectivity(&circuit),
            Err(CircuitError::FloatingNode {
                node: "N2".to_string()
            })
        );
    }

    #[test]
    fn test_connected_through_battery_chain() {
        let circuit = LinearCircuit::new(
            vec![
                Battery::new([NodeId(0), NodeId(1)], 1.0),
                Battery::new([NodeId(1), NodeId(2)], 1.0),
            ],
            vec![Resistor::new([NodeId(2), NodeId(0)], 10.0)],
            vec![],
        );
        assert!(validate_connectivity(&circuit).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        let circuit = DynamicCircuit::builder()
            .resistor(Resistor::new([NodeId(1), NodeId(0)], 0.0))
            .build();
        assert!(matches!(
            circuit,
            Err(CircuitError::InvalidParameter { ref param, .. }) if param == "resistance"
        ));

        let circuit = DynamicCircuit::builder()
            .battery(Battery::new([NodeId(0), NodeId(1)], 1.0))
            .capacitor(Capacitor::new([NodeId(1), NodeId(0)], -1e-6), ElementState::default())
            .build();
        assert!(matches!(
            circuit,
            Err(CircuitError::InvalidParameter { ref param, .. }) if param == "capacitance"
        ));
    }
}
