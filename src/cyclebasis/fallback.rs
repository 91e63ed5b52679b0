//! Spanning-forest fallback generator.
//!
//! Produces one fundamental cycle per non-forest edge: the edge's
//! endpoints plus the tree path between them. This can always produce a
//! valid basis for any graph, so it backs every other candidate source.

use std::collections::{HashMap, VecDeque};

use crate::circuit::{Circuit, EdgeId, NodeId};

use super::Cycle;

/// Generate the fundamental cycles of a breadth-first spanning forest,
/// sorted by ascending length.
pub fn spanning_forest_cycles(circuit: &Circuit) -> Vec<Cycle> {
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut depth: HashMap<NodeId, usize> = HashMap::new();
    let mut tree_edges: Vec<bool> = vec![false; circuit.edge_capacity()];

    for root in circuit.nodes() {
        if depth.contains_key(&root) {
            continue;
        }
        depth.insert(root, 0);
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            for (u, e) in circuit.neighbors(v) {
                if !depth.contains_key(&u) {
                    depth.insert(u, depth[&v] + 1);
                    parent.insert(u, v);
                    tree_edges[e.index()] = true;
                    queue.push_back(u);
                }
            }
        }
    }

    let mut cycles: Vec<Cycle> = circuit
        .edges()
        .filter(|e| !tree_edges[e.index()])
        .filter_map(|e| fundamental_cycle(circuit, e, &parent, &depth))
        .collect();
    cycles.sort_by_key(Cycle::len);
    cycles
}

/// The cycle closed by a non-tree edge: both endpoints climb to their
/// lowest common ancestor, then the paths are spliced.
fn fundamental_cycle(
    circuit: &Circuit,
    edge: EdgeId,
    parent: &HashMap<NodeId, NodeId>,
    depth: &HashMap<NodeId, usize>,
) -> Option<Cycle> {
    let (a, b) = circuit.endpoints(edge)?;
    let mut up_a = vec![a];
    let mut up_b = vec![b];
    let (mut x, mut y) = (a, b);

    while depth[&x] > depth[&y] {
        x = parent[&x];
        up_a.push(x);
    }
    while depth[&y] > depth[&x] {
        y = parent[&y];
        up_b.push(y);
    }
    while x != y {
        x = parent[&x];
        up_a.push(x);
        y = parent[&y];
        up_b.push(y);
    }

    // up_a ends at the LCA; up_b's copy of the LCA is dropped
    up_b.pop();
    up_b.reverse();
    up_a.extend(up_b);
    Some(Cycle::new(up_a))
}
