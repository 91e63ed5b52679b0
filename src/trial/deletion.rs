//! Node deletion policies.
//!
//! A deletion mode defines what "deleting" a chosen node does to the live
//! circuit: full removal of a radius-scoped ball (annihilation), or an
//! in-place resistance rewrite of the edges around it. Only structural
//! modes change the topology; the runner uses that to decide whether the
//! cycle basis needs a rebuild.

use std::collections::{BTreeSet, HashSet};

use serde_json::{json, Value};

use crate::circuit::{Circuit, EdgeId, NodeId};
use crate::error::Result;

/// What one application of a deletion mode did to the circuit.
#[derive(Debug, Clone, Default)]
pub struct DeletionOutcome {
    /// Nodes structurally removed (target included, when removed).
    pub removed_nodes: Vec<NodeId>,
    /// Whether the graph topology changed.
    pub topology_changed: bool,
}

/// Policy defining the effect of deleting a node.
#[derive(Debug, Clone)]
pub enum DeletionMode {
    /// Remove the target and every unprotected node within `radius` hops.
    Annihilation { radius: usize },
    /// Rewrite the resistance of every edge incident to nodes within
    /// `radius` hops: `r *= factor` when `idempotent` is false,
    /// `r = factor` when true.
    MultiplyResistance {
        factor: f64,
        idempotent: bool,
        radius: usize,
    },
}

impl DeletionMode {
    /// Full removal within the given radius.
    pub fn annihilation(radius: usize) -> Self {
        Self::Annihilation { radius }
    }

    /// In-place resistance scaling or reassignment within the radius.
    pub fn multiply_resistance(factor: f64, idempotent: bool, radius: usize) -> Self {
        Self::MultiplyResistance {
            factor,
            idempotent,
            radius,
        }
    }

    /// Whether this mode removes nodes or edges.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Annihilation { .. })
    }

    /// Apply the deletion to one target.
    ///
    /// The ball of affected nodes is measured by graph distance at the
    /// time of this call: in a multi-target step, later targets see the
    /// graph after earlier removals. `protected` nodes are never removed
    /// and the `measured` edge is never rewritten.
    pub fn apply(
        &self,
        circuit: &mut Circuit,
        target: NodeId,
        protected: &HashSet<NodeId>,
        measured: EdgeId,
    ) -> Result<DeletionOutcome> {
        match *self {
            Self::Annihilation { radius } => {
                let ball = circuit.nodes_within(target, radius);
                let mut removed = Vec::with_capacity(ball.len());
                for v in ball {
                    if v != target && protected.contains(&v) {
                        continue;
                    }
                    circuit.remove_node(v)?;
                    removed.push(v);
                }
                Ok(DeletionOutcome {
                    topology_changed: !removed.is_empty(),
                    removed_nodes: removed,
                })
            }
            Self::MultiplyResistance {
                factor,
                idempotent,
                radius,
            } => {
                let mut edges: BTreeSet<EdgeId> = BTreeSet::new();
                for v in circuit.nodes_within(target, radius) {
                    edges.extend(circuit.neighbors(v).map(|(_, e)| e));
                }
                edges.remove(&measured);
                for edge in edges {
                    let old = circuit.resistance(edge).unwrap_or(0.0);
                    let new = if idempotent { factor } else { old * factor };
                    circuit.set_resistance(edge, new)?;
                }
                Ok(DeletionOutcome::default())
            }
        }
    }

    /// Policy metadata for run reports.
    pub fn info(&self) -> Value {
        match *self {
            Self::Annihilation { radius } => json!({
                "mode": "annihilation",
                "radius": radius,
            }),
            Self::MultiplyResistance {
                factor,
                idempotent,
                radius,
            } => json!({
                "mode": "multiply_resistance",
                "factor": factor,
                "idempotent": idempotent,
                "radius": radius,
            }),
        }
    }
}
