//! Planar-embedding-aware basis construction.
//!
//! Given 2D coordinates for every node, the faces of the straight-line
//! embedding are small, physically meaningful loops (the lattice cells of
//! a grid). Faces are traced from the rotation system induced by the
//! coordinates; the outer face is identified by its traversal orientation
//! and dropped, and the interior faces are merged through the greedy rank
//! filter as the preferred candidate pool.

use std::collections::{HashMap, HashSet};

use crate::circuit::{Circuit, NodeId};
use crate::error::{DefectError, Result};

use super::{from_candidates, Cycle, CycleBasis};

/// Build a cycle basis from the faces of a planar embedding.
///
/// `positions` must contain an `(x, y)` coordinate for every live node.
/// The faces feed the same greedy filter as any other candidate pool, so
/// an imperfect embedding degrades to the fallback generator instead of
/// producing an invalid basis.
pub fn planar_basis(
    circuit: &Circuit,
    positions: &HashMap<NodeId, (f64, f64)>,
) -> Result<CycleBasis> {
    let rotation = rotation_system(circuit, positions)?;
    let faces = trace_faces(&rotation)?;

    let mut candidates = Vec::new();
    for face in faces {
        // interior faces of the rotation system come out counterclockwise
        if signed_area(&face, positions) > 0.0 {
            candidates.push(Cycle::new(face));
        }
    }
    from_candidates(circuit, candidates)
}

/// Neighbors of every live node sorted counterclockwise by angle.
fn rotation_system(
    circuit: &Circuit,
    positions: &HashMap<NodeId, (f64, f64)>,
) -> Result<HashMap<NodeId, Vec<NodeId>>> {
    let mut rotation = HashMap::new();
    for v in circuit.nodes() {
        let &(vx, vy) = positions.get(&v).ok_or_else(|| {
            DefectError::malformed_cycle(format!("no planar position for node {v}"))
        })?;
        let mut neighbors: Vec<NodeId> = circuit.neighbors(v).map(|(u, _)| u).collect();
        for &u in &neighbors {
            if !positions.contains_key(&u) {
                return Err(DefectError::malformed_cycle(format!(
                    "no planar position for node {u}"
                )));
            }
        }
        neighbors.sort_by(|&a, &b| {
            let (ax, ay) = positions[&a];
            let (bx, by) = positions[&b];
            let ta = (ay - vy).atan2(ax - vx);
            let tb = (by - vy).atan2(bx - vx);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });
        rotation.insert(v, neighbors);
    }
    Ok(rotation)
}

/// Trace every face of the rotation system once.
///
/// From a directed edge `u -> v`, the next directed edge leaves `v` toward
/// the neighbor immediately clockwise of `u` in `v`'s rotation. Each
/// directed edge belongs to exactly one face. An adjacency-derived
/// rotation always lists `u` among `v`'s neighbors; a rotation that does
/// not is rejected rather than traced from a wrong position.
fn trace_faces(rotation: &HashMap<NodeId, Vec<NodeId>>) -> Result<Vec<Vec<NodeId>>> {
    let mut visited: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut faces = Vec::new();

    let mut starts: Vec<(NodeId, NodeId)> = Vec::new();
    let mut nodes: Vec<&NodeId> = rotation.keys().collect();
    nodes.sort();
    for &u in nodes {
        for &v in &rotation[&u] {
            starts.push((u, v));
        }
    }

    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut face = Vec::new();
        let (mut u, mut v) = start;
        loop {
            visited.insert((u, v));
            face.push(u);
            let order = &rotation[&v];
            let idx = order.iter().position(|&w| w == u).ok_or_else(|| {
                DefectError::malformed_cycle(format!(
                    "rotation at {v} is missing neighbor {u}"
                ))
            })?;
            let w = order[(idx + order.len() - 1) % order.len()];
            u = v;
            v = w;
            if (u, v) == start {
                break;
            }
        }
        faces.push(face);
    }
    Ok(faces)
}

/// Shoelace signed area of a closed node walk.
fn signed_area(face: &[NodeId], positions: &HashMap<NodeId, (f64, f64)>) -> f64 {
    let mut area = 0.0;
    for i in 0..face.len() {
        let (x0, y0) = positions[&face[i]];
        let (x1, y1) = positions[&face[(i + 1) % face.len()]];
        area += x0 * y1 - x1 * y0;
    }
    area / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cyclebasis::required_rank;

    fn square_grid(n: usize) -> (Circuit, HashMap<NodeId, (f64, f64)>) {
        let mut g = Circuit::new();
        let mut pos = HashMap::new();
        let ids: Vec<Vec<NodeId>> = (0..n)
            .map(|r| {
                (0..n)
                    .map(|c| {
                        let id = g.add_node(format!("g{r},{c}")).unwrap();
                        pos.insert(id, (c as f64, r as f64));
                        id
                    })
                    .collect()
            })
            .collect();
        for r in 0..n {
            for c in 0..n {
                if c + 1 < n {
                    g.add_resistor(ids[r][c], ids[r][c + 1], 1.0).unwrap();
                }
                if r + 1 < n {
                    g.add_resistor(ids[r][c], ids[r + 1][c], 1.0).unwrap();
                }
            }
        }
        (g, pos)
    }

    #[test]
    fn test_grid_faces_are_unit_squares() {
        let (g, pos) = square_grid(3);
        let basis = planar_basis(&g, &pos).unwrap();
        assert_eq!(basis.len(), required_rank(&g));
        assert_eq!(basis.len(), 4);
        for cycle in basis.iter() {
            assert_eq!(cycle.len(), 4, "planar basis cell is not a unit face");
        }
    }

    #[test]
    fn test_larger_grid_full_rank() {
        let (g, pos) = square_grid(5);
        let basis = planar_basis(&g, &pos).unwrap();
        assert_eq!(basis.len(), required_rank(&g));
        assert!(basis.iter().all(|c| c.len() == 4));
    }

    #[test]
    fn test_inconsistent_rotation_rejected() {
        // b's rotation lacks the reverse of the directed edge a -> b
        let a = NodeId(0);
        let b = NodeId(1);
        let rotation: HashMap<NodeId, Vec<NodeId>> =
            [(a, vec![b]), (b, Vec::new())].into_iter().collect();
        assert!(matches!(
            trace_faces(&rotation),
            Err(DefectError::MalformedCycle { .. })
        ));
    }

    #[test]
    fn test_missing_position_rejected() {
        let (g, mut pos) = square_grid(2);
        let some = g.nodes().next().unwrap();
        pos.remove(&some);
        assert!(matches!(
            planar_basis(&g, &pos),
            Err(DefectError::MalformedCycle { .. })
        ));
    }
}
