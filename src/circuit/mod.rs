//! Circuit graph representation and validation.
//!
//! The circuit is an undirected weighted graph: every edge carries a fixed
//! [`EdgeAttr`] record (resistance, source voltage, orientation). One edge,
//! the *measured edge*, carries the source voltage; its branch current is
//! the simulation's output signal.

mod graph;
mod types;
mod validate;

pub use graph::Circuit;
pub use types::{EdgeAttr, EdgeId, NodeId};
pub use validate::validate_circuit;
