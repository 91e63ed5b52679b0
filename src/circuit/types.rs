//! Core types for circuit representation.

use std::fmt;

/// A stable identifier for a node in the circuit.
///
/// Node ids are arena indices: they remain valid across node removal
/// (removed slots are tombstoned, never reused), so cycles that reference
/// nodes by id stay meaningful mid-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Raw index into the node arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A stable identifier for an edge in the circuit.
///
/// Like [`NodeId`], edge ids are tombstoned arena indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

impl EdgeId {
    /// Raw index into the edge arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Fixed attribute record carried by every edge.
///
/// Every edge has all three attributes by construction; there is no
/// "attribute present on some edges but not others" state to validate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttr {
    /// Resistance in ohms. Zero means an ideal wire.
    pub resistance: f64,
    /// Source EMF in volts. Nonzero only on the measured edge in the
    /// standard trial configuration.
    pub source_voltage: f64,
    /// The endpoint treated as the positive direction for signed current
    /// bookkeeping: a positive branch current flows *from* this endpoint
    /// toward the other.
    pub orientation: NodeId,
}

impl EdgeAttr {
    /// A passive resistor.
    pub fn resistor(resistance: f64, orientation: NodeId) -> Self {
        Self {
            resistance,
            source_voltage: 0.0,
            orientation,
        }
    }

    /// An ideal zero-resistance wire.
    pub fn wire(orientation: NodeId) -> Self {
        Self::resistor(0.0, orientation)
    }

    /// An ideal voltage source (zero internal resistance).
    pub fn battery(voltage: f64, orientation: NodeId) -> Self {
        Self {
            resistance: 0.0,
            source_voltage: voltage,
            orientation,
        }
    }

    /// Traversal sign for walking this edge starting at `from`: +1 when
    /// walking in the edge's positive direction, -1 against it.
    pub fn sign_from(&self, from: NodeId) -> f64 {
        if from == self.orientation {
            1.0
        } else {
            -1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_convention() {
        let attr = EdgeAttr::battery(1.0, NodeId(3));
        assert_eq!(attr.sign_from(NodeId(3)), 1.0);
        assert_eq!(attr.sign_from(NodeId(7)), -1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId(4).to_string(), "n4");
        assert_eq!(EdgeId(9).to_string(), "e9");
    }
}
