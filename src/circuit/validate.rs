//! Circuit validation.

use crate::error::{DefectError, Result};

use super::graph::Circuit;
use super::types::EdgeId;

/// Validate a circuit for trial execution.
///
/// Checks:
/// - The measured edge is live
/// - It is the only edge carrying a nonzero source voltage
/// - Every resistance is finite and non-negative
pub fn validate_circuit(circuit: &Circuit, measured: EdgeId) -> Result<()> {
    if !circuit.contains_edge(measured) {
        return Err(DefectError::invalid_topology(format!(
            "measured edge {measured} is not live"
        )));
    }

    for edge in circuit.edges() {
        let attr = circuit.edge_attr(edge).ok_or_else(|| {
            DefectError::invalid_topology(format!("edge {edge} vanished during validation"))
        })?;

        if attr.source_voltage != 0.0 && edge != measured {
            return Err(DefectError::invalid_topology(format!(
                "edge {edge} carries a source voltage but is not the measured edge"
            )));
        }

        if !attr.resistance.is_finite() || attr.resistance < 0.0 {
            return Err(DefectError::invalid_topology(format!(
                "edge {edge} has invalid resistance {}",
                attr.resistance
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_source_enforced() {
        let mut g = Circuit::new();
        let a = g.add_node("a").unwrap();
        let b = g.add_node("b").unwrap();
        let c = g.add_node("c").unwrap();
        let ab = g.add_battery(a, b, 1.0).unwrap();
        g.add_resistor(b, c, 1.0).unwrap();
        g.add_resistor(c, a, 1.0).unwrap();
        assert!(validate_circuit(&g, ab).is_ok());

        g.add_battery(b, c, 2.0).unwrap();
        assert!(validate_circuit(&g, ab).is_err());
    }

    #[test]
    fn test_negative_resistance_rejected() {
        let mut g = Circuit::new();
        let a = g.add_node("a").unwrap();
        let b = g.add_node("b").unwrap();
        let ab = g.add_battery(a, b, 1.0).unwrap();
        let c = g.add_node("c").unwrap();
        g.add_resistor(a, c, -1.0).unwrap();
        assert!(validate_circuit(&g, ab).is_err());
    }
}
