//! Cycle basis construction for mesh analysis.
//!
//! A cycle basis is an ordered set of closed walks whose edge-indicator
//! vectors are linearly independent over GF(2) and span the graph's cycle
//! space (dimension `|E| - |V| + components`). Candidates are merged
//! greedily in order of ascending length through an incremental rank
//! filter; whenever the candidate pool falls short, the spanning-forest
//! fallback generator tops up the basis.
//!
//! Candidate sources, in priority order:
//! 1. faces of a planar embedding ([`planar::planar_basis`])
//! 2. caller-supplied cycles ([`from_candidates`])
//! 3. spanning-forest fundamental cycles ([`fallback::spanning_forest_cycles`])

pub mod fallback;
pub mod planar;

use crate::circuit::{Circuit, EdgeId, NodeId};
use crate::error::{DefectError, Result};

/// A closed walk in the circuit graph.
///
/// Stored as the ordered node sequence `v0, v1, ..., vk`; the closing hop
/// `vk -> v0` is implicit. Adjacent nodes must be connected by a live edge
/// for the cycle to resolve against a given circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    nodes: Vec<NodeId>,
}

impl Cycle {
    /// Create a cycle from an ordered node sequence.
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    /// The node sequence (closing hop implicit).
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of hops (equals the number of nodes).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cycle has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the walk passes through the given node.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Resolve the walk against a circuit as `(edge, sign)` pairs.
    ///
    /// The sign is +1 where the walk traverses the edge in its positive
    /// direction and -1 against it. Fails with [`DefectError::MalformedCycle`]
    /// when a node is missing or two adjacent nodes share no live edge.
    pub fn edges(&self, circuit: &Circuit) -> Result<Vec<(EdgeId, f64)>> {
        if self.nodes.len() < 2 {
            return Err(DefectError::malformed_cycle(format!(
                "cycle has only {} node(s)",
                self.nodes.len()
            )));
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        for i in 0..self.nodes.len() {
            let u = self.nodes[i];
            let v = self.nodes[(i + 1) % self.nodes.len()];
            if !circuit.contains_node(u) {
                return Err(DefectError::malformed_cycle(format!(
                    "cycle references missing node {u}"
                )));
            }
            let edge = circuit.edge_between(u, v).ok_or_else(|| {
                DefectError::malformed_cycle(format!("no edge between {u} and {v}"))
            })?;
            let sign = circuit
                .edge_attr(edge)
                .map(|attr| attr.sign_from(u))
                .unwrap_or(1.0);
            out.push((edge, sign));
        }
        Ok(out)
    }

    /// Whether every node is live and every hop has a live edge.
    pub fn is_live(&self, circuit: &Circuit) -> bool {
        if self.nodes.len() < 2 {
            return false;
        }
        for i in 0..self.nodes.len() {
            let u = self.nodes[i];
            let v = self.nodes[(i + 1) % self.nodes.len()];
            if circuit.edge_between(u, v).is_none() {
                return false;
            }
        }
        true
    }

    /// Edge-indicator vector over GF(2), packed into 64-bit blocks indexed
    /// by edge id. An edge traversed twice cancels out.
    fn edge_bits(&self, circuit: &Circuit) -> Result<Vec<u64>> {
        let blocks = circuit.edge_capacity().div_ceil(64);
        let mut bits = vec![0u64; blocks];
        for (edge, _) in self.edges(circuit)? {
            bits[edge.index() / 64] ^= 1u64 << (edge.index() % 64);
        }
        Ok(bits)
    }
}

/// Incremental GF(2) rank filter over edge-indicator vectors.
///
/// Maintains a row-echelon set of accepted vectors; [`CycleSpace::insert`]
/// reports whether a candidate increased the rank. This replaces a generic
/// library rank test with the one operation the builder actually needs.
#[derive(Debug, Default)]
pub struct CycleSpace {
    /// Reduced rows paired with their leading-bit position.
    rows: Vec<(usize, Vec<u64>)>,
}

impl CycleSpace {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rank.
    pub fn rank(&self) -> usize {
        self.rows.len()
    }

    /// Try to insert a vector; returns true iff it was independent of the
    /// rows accepted so far (rank strictly increased).
    pub fn insert(&mut self, mut bits: Vec<u64>) -> bool {
        for (pivot, row) in &self.rows {
            if bit_set(&bits, *pivot) {
                for (b, r) in bits.iter_mut().zip(row) {
                    *b ^= r;
                }
            }
        }
        match leading_bit(&bits) {
            Some(pivot) => {
                self.rows.push((pivot, bits));
                true
            }
            None => false,
        }
    }
}

fn bit_set(bits: &[u64], index: usize) -> bool {
    bits.get(index / 64)
        .map_or(false, |block| block & (1u64 << (index % 64)) != 0)
}

fn leading_bit(bits: &[u64]) -> Option<usize> {
    for (i, block) in bits.iter().enumerate() {
        if *block != 0 {
            return Some(i * 64 + block.trailing_zeros() as usize);
        }
    }
    None
}

/// An ordered, linearly independent, spanning set of cycles.
#[derive(Debug, Clone, Default)]
pub struct CycleBasis {
    cycles: Vec<Cycle>,
}

impl CycleBasis {
    /// The accepted cycles in acceptance order.
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Basis size (= rank).
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// Whether the basis is empty.
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Iterate over the cycles.
    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter()
    }
}

/// Dimension of the circuit's cycle space: `|E| - |V| + components`.
pub fn required_rank(circuit: &Circuit) -> usize {
    circuit.num_edges() + circuit.num_components() - circuit.num_nodes()
}

/// Build a basis from caller-supplied candidate cycles.
///
/// Candidates are validated, then consumed in order of ascending length;
/// each is accepted iff it increases the rank. If the pool is exhausted
/// before full rank, the spanning-forest fallback tops up the basis.
/// Fails with [`DefectError::CycleBasisIncomplete`] if full rank is still
/// not reached: that indicates a defective candidate source, not a normal
/// runtime condition.
pub fn from_candidates(circuit: &Circuit, mut candidates: Vec<Cycle>) -> Result<CycleBasis> {
    let required = required_rank(circuit);
    let mut space = CycleSpace::new();
    let mut accepted = Vec::new();

    candidates.sort_by_key(Cycle::len);
    for cycle in candidates {
        let bits = cycle.edge_bits(circuit)?;
        if space.rank() < required && space.insert(bits) {
            accepted.push(cycle);
        }
    }

    if space.rank() < required {
        for cycle in fallback::spanning_forest_cycles(circuit) {
            if space.rank() == required {
                break;
            }
            let bits = cycle.edge_bits(circuit)?;
            if space.insert(bits) {
                accepted.push(cycle);
            }
        }
    }

    if space.rank() < required {
        return Err(DefectError::CycleBasisIncomplete {
            rank: space.rank(),
            required,
        });
    }
    Ok(CycleBasis { cycles: accepted })
}

/// Build a basis from the fallback generator alone.
pub fn fallback_basis(circuit: &Circuit) -> Result<CycleBasis> {
    from_candidates(circuit, Vec::new())
}

/// Check that a basis spans the circuit's cycle space.
///
/// Fails with [`DefectError::CycleBasisIncomplete`] when the cycles fall
/// short of the required rank. A deficient basis makes every solve
/// understate the current without any other symptom, so callers accepting
/// an external basis must reject it up front.
pub fn ensure_full_rank(circuit: &Circuit, basis: &CycleBasis) -> Result<()> {
    let required = required_rank(circuit);
    let mut space = CycleSpace::new();
    for cycle in basis.iter() {
        space.insert(cycle.edge_bits(circuit)?);
    }
    if space.rank() < required {
        return Err(DefectError::CycleBasisIncomplete {
            rank: space.rank(),
            required,
        });
    }
    Ok(())
}

/// Re-derive a basis after the topology changed.
///
/// Cycles untouched by the change survive and stay independent (they are a
/// subset of an independent set over an unchanged sub-support). When the
/// survivors alone already reach the new required rank, they are reused
/// unmodified; otherwise the basis is topped up from the fallback
/// generator.
pub fn rebuild(circuit: &Circuit, previous: &CycleBasis) -> Result<CycleBasis> {
    let survivors: Vec<Cycle> = previous
        .iter()
        .filter(|c| c.is_live(circuit))
        .cloned()
        .collect();

    if survivors.len() == required_rank(circuit) {
        return Ok(CycleBasis { cycles: survivors });
    }
    from_candidates(circuit, survivors)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// n x n grid of unit resistors; returns row-major node ids.
    pub(crate) fn grid(circuit: &mut Circuit, n: usize) -> Vec<Vec<NodeId>> {
        let ids: Vec<Vec<NodeId>> = (0..n)
            .map(|r| {
                (0..n)
                    .map(|c| circuit.add_node(format!("g{r},{c}")).unwrap())
                    .collect()
            })
            .collect();
        for r in 0..n {
            for c in 0..n {
                if c + 1 < n {
                    circuit.add_resistor(ids[r][c], ids[r][c + 1], 1.0).unwrap();
                }
                if r + 1 < n {
                    circuit.add_resistor(ids[r][c], ids[r + 1][c], 1.0).unwrap();
                }
            }
        }
        ids
    }

    #[test]
    fn test_required_rank_grid() {
        let mut g = Circuit::new();
        grid(&mut g, 3);
        // 9 nodes, 12 edges, 1 component
        assert_eq!(required_rank(&g), 4);
    }

    #[test]
    fn test_fallback_reaches_full_rank() {
        let mut g = Circuit::new();
        grid(&mut g, 4);
        let basis = fallback_basis(&g).unwrap();
        assert_eq!(basis.len(), required_rank(&g));
    }

    #[test]
    fn test_rank_strictly_increases() {
        let mut g = Circuit::new();
        grid(&mut g, 3);
        let basis = fallback_basis(&g).unwrap();
        let mut space = CycleSpace::new();
        for cycle in basis.iter() {
            let bits = cycle.edge_bits(&g).unwrap();
            assert!(space.insert(bits), "accepted cycle was dependent");
        }
    }

    #[test]
    fn test_redundant_cycle_rejected() {
        let mut g = Circuit::new();
        let ids = grid(&mut g, 2);
        let square = Cycle::new(vec![ids[0][0], ids[0][1], ids[1][1], ids[1][0]]);
        let mut space = CycleSpace::new();
        assert!(space.insert(square.edge_bits(&g).unwrap()));
        // the same loop traversed the other way is the same GF(2) vector
        let reversed = Cycle::new(vec![ids[1][0], ids[1][1], ids[0][1], ids[0][0]]);
        assert!(!space.insert(reversed.edge_bits(&g).unwrap()));
    }

    #[test]
    fn test_malformed_cycle_detected() {
        let mut g = Circuit::new();
        let ids = grid(&mut g, 2);
        // diagonal hop: no such edge
        let bad = Cycle::new(vec![ids[0][0], ids[1][1], ids[1][0]]);
        assert!(matches!(
            from_candidates(&g, vec![bad]),
            Err(DefectError::MalformedCycle { .. })
        ));
    }

    #[test]
    fn test_good_candidates_preferred() {
        let mut g = Circuit::new();
        let ids = grid(&mut g, 2);
        let square = Cycle::new(vec![ids[0][0], ids[0][1], ids[1][1], ids[1][0]]);
        let basis = from_candidates(&g, vec![square.clone()]).unwrap();
        assert_eq!(basis.len(), 1);
        assert_eq!(basis.cycles()[0], square);
    }

    #[test]
    fn test_rebuild_after_deletion() {
        let mut g = Circuit::new();
        let ids = grid(&mut g, 3);
        let basis = fallback_basis(&g).unwrap();
        assert_eq!(basis.len(), 4);

        // removing the center node destroys every unit face around it
        g.remove_node(ids[1][1]).unwrap();
        let rebuilt = rebuild(&g, &basis).unwrap();
        assert_eq!(rebuilt.len(), required_rank(&g));
        // 8 nodes, 8 edges, 1 component -> rank 1 (the outer ring)
        assert_eq!(rebuilt.len(), 1);
        for cycle in rebuilt.iter() {
            assert!(!cycle.contains_node(ids[1][1]));
        }
    }

    #[test]
    fn test_rebuild_reuses_untouched_basis() {
        let mut g = Circuit::new();
        let ids = grid(&mut g, 3);
        // corner appendage: adds a node and an edge, no new cycle
        let extra = g.add_node("extra").unwrap();
        g.add_resistor(ids[0][0], extra, 1.0).unwrap();

        let basis = fallback_basis(&g).unwrap();
        g.remove_node(extra).unwrap();
        let rebuilt = rebuild(&g, &basis).unwrap();
        assert_eq!(rebuilt.cycles(), basis.cycles());
    }

    #[test]
    fn test_ensure_full_rank() {
        let mut g = Circuit::new();
        grid(&mut g, 3);
        let basis = fallback_basis(&g).unwrap();
        assert!(ensure_full_rank(&g, &basis).is_ok());

        let short = CycleBasis {
            cycles: basis.cycles()[..3].to_vec(),
        };
        assert!(matches!(
            ensure_full_rank(&g, &short),
            Err(DefectError::CycleBasisIncomplete {
                rank: 3,
                required: 4
            })
        ));
        assert!(matches!(
            ensure_full_rank(&g, &CycleBasis::default()),
            Err(DefectError::CycleBasisIncomplete { .. })
        ));
    }

    #[test]
    fn test_edgeless_graph_has_empty_basis() {
        // disconnected edgeless pair: rank 0, trivially complete
        let mut g = Circuit::new();
        g.add_node("a").unwrap();
        g.add_node("b").unwrap();
        let basis = fallback_basis(&g).unwrap();
        assert!(basis.is_empty());
    }
}
