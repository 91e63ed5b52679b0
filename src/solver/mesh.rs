//! Mesh-current (loop-current) analysis.
//!
//! One unknown current per basis cycle. Kirchhoff's voltage law around
//! cycle `i` gives row `i` of the symmetric system `R * i_loop = v_loop`:
//! the diagonal holds the cycle's own resistance, off-diagonal entries the
//! signed resistance shared with every other cycle, and `v_loop` is
//! nonzero only for cycles traversing the source edge. Branch currents are
//! recovered as signed sums of the loop currents over the cycles that
//! traverse each edge.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::circuit::{Circuit, EdgeId};
use crate::cyclebasis::CycleBasis;
use crate::error::{DefectError, Result};

use super::matrix::MeshMatrix;

/// Solved loop currents for one circuit topology.
#[derive(Debug, Clone, Default)]
pub struct MeshSolution {
    loop_currents: Vec<f64>,
    branch: HashMap<EdgeId, f64>,
    measured: f64,
}

impl MeshSolution {
    /// Loop current per selected basis cycle.
    pub fn loop_currents(&self) -> &[f64] {
        &self.loop_currents
    }

    /// Signed current through an edge, positive toward its orientation
    /// endpoint. Edges on no basis cycle are bridges and carry none.
    pub fn branch_current(&self, edge: EdgeId) -> f64 {
        self.branch.get(&edge).copied().unwrap_or(0.0)
    }

    /// Signed current through the measured edge.
    pub fn measured_current(&self) -> f64 {
        self.measured
    }
}

/// Solve the network for the current topology.
///
/// If the measured edge's endpoints are disconnected (apart from the
/// measured edge itself), no system is assembled and every current is
/// exactly zero. This is a defined state, not an error.
pub fn solve(circuit: &Circuit, basis: &CycleBasis, measured: EdgeId) -> Result<MeshSolution> {
    let (a, b) = circuit.endpoints(measured).ok_or_else(|| {
        DefectError::invalid_topology(format!("measured edge {measured} is not live"))
    })?;

    if !circuit.connected_excluding(a, b, measured) {
        return Ok(MeshSolution::default());
    }

    // Restrict to the connected component containing the source edge.
    let component: HashSet<_> = circuit.component_of(a).into_iter().collect();
    let mut cycle_edges = Vec::new();
    for cycle in basis.iter() {
        if cycle.nodes().iter().all(|v| component.contains(v)) {
            cycle_edges.push(cycle.edges(circuit)?);
        }
    }

    let n = cycle_edges.len();
    if n == 0 {
        return Ok(MeshSolution::default());
    }

    // Which cycles traverse each edge, with traversal signs.
    let mut traversals: BTreeMap<EdgeId, Vec<(usize, f64)>> = BTreeMap::new();
    for (i, edges) in cycle_edges.iter().enumerate() {
        for &(edge, sign) in edges {
            traversals.entry(edge).or_default().push((i, sign));
        }
    }

    let mut system = MeshMatrix::new(n);
    for (&edge, entries) in &traversals {
        let attr = circuit.edge_attr(edge).ok_or_else(|| {
            DefectError::invalid_topology(format!("edge {edge} vanished during assembly"))
        })?;
        for &(i, si) in entries {
            for &(j, sj) in entries {
                system.add(i, j, si * sj * attr.resistance);
            }
            system.add_source(i, si * attr.source_voltage);
        }
    }

    system.factor()?;
    system.solve()?;

    let mut branch = HashMap::with_capacity(traversals.len());
    for (&edge, entries) in &traversals {
        let current: f64 = entries.iter().map(|&(i, s)| s * system.x[i]).sum();
        branch.insert(edge, current);
    }
    let measured_current = branch.get(&measured).copied().unwrap_or(0.0);

    Ok(MeshSolution {
        loop_currents: system.x,
        branch,
        measured: measured_current,
    })
}

/// Convenience wrapper returning only the measured current.
pub fn measured_current(circuit: &Circuit, basis: &CycleBasis, measured: EdgeId) -> Result<f64> {
    Ok(solve(circuit, basis, measured)?.measured_current())
}
