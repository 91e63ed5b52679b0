//! Mutable resistor-network graph.
//!
//! Nodes and edges live in tombstoned arenas: removal clears the slot but
//! never shifts indices, so [`NodeId`]s and [`EdgeId`]s held elsewhere
//! (notably by cycle-basis cycles) stay valid while the topology changes.
//!
//! Adjacency is kept per node as an ordered map from neighbor to edge id.
//! The ordering matters: breadth-first traversals (radius balls, spanning
//! forests) must visit neighbors in a reproducible order for trial replay
//! to be bit-for-bit deterministic.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::types::{EdgeAttr, EdgeId, NodeId};
use crate::error::{DefectError, Result};

#[derive(Debug, Clone)]
struct NodeState {
    label: String,
    adjacency: BTreeMap<NodeId, EdgeId>,
}

#[derive(Debug, Clone)]
struct Edge {
    endpoints: [NodeId; 2],
    attr: EdgeAttr,
}

/// An undirected weighted graph where every edge carries an [`EdgeAttr`].
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    nodes: Vec<Option<NodeState>>,
    edges: Vec<Option<Edge>>,
    label_map: HashMap<String, NodeId>,
    live_nodes: usize,
    live_edges: usize,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Construction ============

    /// Add a node with the given label.
    pub fn add_node(&mut self, label: impl Into<String>) -> Result<NodeId> {
        let label = label.into();
        if self.label_map.contains_key(&label) {
            return Err(DefectError::DuplicateNode { node: label });
        }
        let id = NodeId(self.nodes.len());
        self.label_map.insert(label.clone(), id);
        self.nodes.push(Some(NodeState {
            label,
            adjacency: BTreeMap::new(),
        }));
        self.live_nodes += 1;
        Ok(id)
    }

    /// Add an edge between two live nodes.
    ///
    /// Re-adding an edge between already-connected endpoints rewrites its
    /// attributes in place and returns the existing id.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, attr: EdgeAttr) -> Result<EdgeId> {
        if a == b {
            return Err(DefectError::invalid_topology(format!(
                "self-loop on node '{}'",
                self.node_label(a).unwrap_or("?")
            )));
        }
        self.require_node(a)?;
        self.require_node(b)?;

        if let Some(existing) = self.edge_between(a, b) {
            if let Some(edge) = self.edges[existing.index()].as_mut() {
                edge.attr = attr;
            }
            return Ok(existing);
        }

        let id = EdgeId(self.edges.len());
        self.edges.push(Some(Edge {
            endpoints: [a, b],
            attr,
        }));
        // require_node above guarantees both slots are live
        if let Some(node) = self.nodes[a.index()].as_mut() {
            node.adjacency.insert(b, id);
        }
        if let Some(node) = self.nodes[b.index()].as_mut() {
            node.adjacency.insert(a, id);
        }
        self.live_edges += 1;
        Ok(id)
    }

    /// Add a resistor edge. Positive current direction is `a` toward `b`.
    pub fn add_resistor(&mut self, a: NodeId, b: NodeId, resistance: f64) -> Result<EdgeId> {
        self.add_edge(a, b, EdgeAttr::resistor(resistance, a))
    }

    /// Add an ideal zero-resistance wire.
    pub fn add_wire(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId> {
        self.add_edge(a, b, EdgeAttr::wire(a))
    }

    /// Add an ideal voltage source driving current from `a` to `b`.
    pub fn add_battery(&mut self, a: NodeId, b: NodeId, voltage: f64) -> Result<EdgeId> {
        self.add_edge(a, b, EdgeAttr::battery(voltage, a))
    }

    // ============ Queries ============

    /// Whether the node id refers to a live node.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.index())
            .map_or(false, |slot| slot.is_some())
    }

    /// Whether the edge id refers to a live edge.
    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        self.edges
            .get(edge.index())
            .map_or(false, |slot| slot.is_some())
    }

    /// Look up a node id by label.
    pub fn find_node(&self, label: &str) -> Option<NodeId> {
        self.label_map.get(label).copied()
    }

    /// Look up a node id by label, or fail.
    pub fn node_id(&self, label: &str) -> Result<NodeId> {
        self.find_node(label)
            .ok_or_else(|| DefectError::node_not_found(label))
    }

    /// Label of a node (live or tombstoned).
    pub fn node_label(&self, node: NodeId) -> Option<&str> {
        self.nodes
            .get(node.index())
            .and_then(|slot| slot.as_ref())
            .map(|n| n.label.as_str())
    }

    /// Iterate over live node ids in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| NodeId(i)))
    }

    /// Iterate over live edge ids in arena order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| EdgeId(i)))
    }

    /// Iterate over a live node's neighbors as `(neighbor, edge)` pairs,
    /// in neighbor-id order. Empty for a tombstoned node.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, EdgeId)> + '_ {
        self.nodes
            .get(node.index())
            .and_then(|slot| slot.as_ref())
            .into_iter()
            .flat_map(|n| n.adjacency.iter().map(|(&v, &e)| (v, e)))
    }

    /// Number of live edges incident to a node.
    pub fn degree(&self, node: NodeId) -> usize {
        self.nodes
            .get(node.index())
            .and_then(|slot| slot.as_ref())
            .map_or(0, |n| n.adjacency.len())
    }

    /// The edge connecting two nodes, if both are live and adjacent.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.nodes
            .get(a.index())
            .and_then(|slot| slot.as_ref())
            .and_then(|n| n.adjacency.get(&b).copied())
    }

    /// Endpoints of a live edge.
    pub fn endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edges
            .get(edge.index())
            .and_then(|slot| slot.as_ref())
            .map(|e| (e.endpoints[0], e.endpoints[1]))
    }

    /// Attribute record of a live edge.
    pub fn edge_attr(&self, edge: EdgeId) -> Option<&EdgeAttr> {
        self.edges
            .get(edge.index())
            .and_then(|slot| slot.as_ref())
            .map(|e| &e.attr)
    }

    /// Resistance of a live edge.
    pub fn resistance(&self, edge: EdgeId) -> Option<f64> {
        self.edge_attr(edge).map(|a| a.resistance)
    }

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.live_nodes
    }

    /// Number of live edges.
    pub fn num_edges(&self) -> usize {
        self.live_edges
    }

    /// Arena length of the edge store, including tombstones.
    /// Used to size edge-indexed bit vectors.
    pub fn edge_capacity(&self) -> usize {
        self.edges.len()
    }

    // ============ Mutation ============

    /// Remove a node and all of its incident edges.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.require_node(node)?;
        let incident: Vec<EdgeId> = self.neighbors(node).map(|(_, e)| e).collect();
        for edge in incident {
            self.remove_edge(edge)?;
        }
        if let Some(slot) = self.nodes.get_mut(node.index()) {
            *slot = None;
            self.live_nodes -= 1;
        }
        Ok(())
    }

    /// Remove a single edge.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<()> {
        let (a, b) = self.endpoints(edge).ok_or_else(|| {
            DefectError::invalid_topology(format!("edge {edge} is not live"))
        })?;
        if let Some(node) = self.nodes[a.index()].as_mut() {
            node.adjacency.remove(&b);
        }
        if let Some(node) = self.nodes[b.index()].as_mut() {
            node.adjacency.remove(&a);
        }
        self.edges[edge.index()] = None;
        self.live_edges -= 1;
        Ok(())
    }

    /// Rewrite the resistance of a live edge in place.
    pub fn set_resistance(&mut self, edge: EdgeId, resistance: f64) -> Result<()> {
        match self.edges.get_mut(edge.index()).and_then(|s| s.as_mut()) {
            Some(e) => {
                e.attr.resistance = resistance;
                Ok(())
            }
            None => Err(DefectError::invalid_topology(format!(
                "edge {edge} is not live"
            ))),
        }
    }

    // ============ Connectivity ============

    /// Whether two live nodes are connected by live edges.
    pub fn connected(&self, a: NodeId, b: NodeId) -> bool {
        self.bfs_reaches(a, b, None)
    }

    /// Whether two live nodes are connected when one edge is ignored.
    ///
    /// Used for the measured-edge disconnect test: the measured edge is
    /// never deleted, so it must not itself count as a path between its
    /// endpoints.
    pub fn connected_excluding(&self, a: NodeId, b: NodeId, excluded: EdgeId) -> bool {
        self.bfs_reaches(a, b, Some(excluded))
    }

    /// All live nodes within `radius` hops of `center` (inclusive), in
    /// breadth-first order.
    pub fn nodes_within(&self, center: NodeId, radius: usize) -> Vec<NodeId> {
        if !self.contains_node(center) {
            return Vec::new();
        }
        let mut order = vec![center];
        let mut dist: HashMap<NodeId, usize> = HashMap::new();
        dist.insert(center, 0);
        let mut queue = VecDeque::from([center]);
        while let Some(v) = queue.pop_front() {
            let d = dist[&v];
            if d == radius {
                continue;
            }
            for (u, _) in self.neighbors(v) {
                if !dist.contains_key(&u) {
                    dist.insert(u, d + 1);
                    order.push(u);
                    queue.push_back(u);
                }
            }
        }
        order
    }

    /// The set of live nodes in the same connected component as `start`,
    /// in breadth-first order.
    pub fn component_of(&self, start: NodeId) -> Vec<NodeId> {
        self.nodes_within(start, usize::MAX)
    }

    /// Number of connected components among live nodes.
    pub fn num_components(&self) -> usize {
        let mut seen = vec![false; self.nodes.len()];
        let mut count = 0;
        for root in self.nodes() {
            if seen[root.index()] {
                continue;
            }
            count += 1;
            for v in self.component_of(root) {
                seen[v.index()] = true;
            }
        }
        count
    }

    fn bfs_reaches(&self, a: NodeId, b: NodeId, excluded: Option<EdgeId>) -> bool {
        if !self.contains_node(a) || !self.contains_node(b) {
            return false;
        }
        if a == b {
            return true;
        }
        let mut seen = vec![false; self.nodes.len()];
        seen[a.index()] = true;
        let mut queue = VecDeque::from([a]);
        while let Some(v) = queue.pop_front() {
            for (u, e) in self.neighbors(v) {
                if Some(e) == excluded || seen[u.index()] {
                    continue;
                }
                if u == b {
                    return true;
                }
                seen[u.index()] = true;
                queue.push_back(u);
            }
        }
        false
    }

    fn require_node(&self, node: NodeId) -> Result<()> {
        if self.contains_node(node) {
            Ok(())
        } else {
            Err(DefectError::node_not_found(format!("{node}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path3() -> (Circuit, NodeId, NodeId, NodeId) {
        let mut g = Circuit::new();
        let a = g.add_node("a").unwrap();
        let b = g.add_node("b").unwrap();
        let c = g.add_node("c").unwrap();
        g.add_resistor(a, b, 1.0).unwrap();
        g.add_resistor(b, c, 2.0).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn test_build_and_query() {
        let (g, a, b, c) = path3();
        assert_eq!(g.num_nodes(), 3);
        assert_eq!(g.num_edges(), 2);
        assert_eq!(g.degree(b), 2);
        assert!(g.edge_between(a, b).is_some());
        assert!(g.edge_between(a, c).is_none());
        assert_eq!(g.find_node("b"), Some(b));
        assert_eq!(g.node_label(c), Some("c"));
    }

    #[test]
    fn test_remove_node_tombstones() {
        let (mut g, a, b, c) = path3();
        g.remove_node(b).unwrap();
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.num_edges(), 0);
        assert!(!g.contains_node(b));
        // surviving ids are unaffected
        assert!(g.contains_node(a));
        assert!(g.contains_node(c));
        assert!(!g.connected(a, c));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut g = Circuit::new();
        g.add_node("x").unwrap();
        assert!(matches!(
            g.add_node("x"),
            Err(DefectError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn test_readding_edge_rewrites_attr() {
        let (mut g, a, b, _) = path3();
        let e1 = g.add_resistor(a, b, 5.0).unwrap();
        assert_eq!(g.resistance(e1), Some(5.0));
        assert_eq!(g.num_edges(), 2);
    }

    #[test]
    fn test_set_resistance_in_place() {
        let (mut g, a, b, _) = path3();
        let e = g.edge_between(a, b).unwrap();
        g.set_resistance(e, 100.0).unwrap();
        assert_eq!(g.resistance(e), Some(100.0));
    }

    #[test]
    fn test_connected_excluding_edge() {
        let mut g = Circuit::new();
        let a = g.add_node("a").unwrap();
        let b = g.add_node("b").unwrap();
        let c = g.add_node("c").unwrap();
        let ab = g.add_battery(a, b, 1.0).unwrap();
        g.add_resistor(a, c, 1.0).unwrap();
        g.add_resistor(c, b, 1.0).unwrap();

        assert!(g.connected_excluding(a, b, ab));
        g.remove_node(c).unwrap();
        // only the excluded edge itself remains between a and b
        assert!(g.connected(a, b));
        assert!(!g.connected_excluding(a, b, ab));
    }

    #[test]
    fn test_nodes_within_radius() {
        let mut g = Circuit::new();
        let ids: Vec<NodeId> = (0..5)
            .map(|i| g.add_node(format!("v{i}")).unwrap())
            .collect();
        for w in ids.windows(2) {
            g.add_resistor(w[0], w[1], 1.0).unwrap();
        }
        let ball = g.nodes_within(ids[2], 1);
        assert_eq!(ball, vec![ids[2], ids[1], ids[3]]);
        assert_eq!(g.nodes_within(ids[0], 0), vec![ids[0]]);
    }

    #[test]
    fn test_num_components() {
        let (mut g, _, b, _) = path3();
        assert_eq!(g.num_components(), 1);
        g.remove_node(b).unwrap();
        assert_eq!(g.num_components(), 2);
    }
}
