//! # Defect Core
//!
//! A defect-trial simulator for linear resistor networks.
//!
//! This library provides:
//! - A mutable resistor-network graph with stable node/edge identities
//! - Cycle basis construction (planar faces, supplied cycles, or a
//!   spanning-forest fallback) with an incremental GF(2) rank filter
//! - A mesh-current network solver for the measured-edge branch current
//! - A trial runner that applies pluggable node-selection and
//!   node-deletion policies step by step, recording the current after
//!   every step
//! - Orchestration of many independent trials across a worker pool
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Circuit graph representation and validation
//! - [`cyclebasis`] - Cycle basis construction and repair
//! - [`solver`] - Mesh matrix assembly and numerical solving
//! - [`trial`] - Selection/deletion policies, the trial runner, and
//!   multi-trial orchestration
//!
//! ## Usage
//!
//! ```no_run
//! use defect_core::{Circuit, DeletionMode, TrialRunner};
//!
//! # fn main() -> defect_core::Result<()> {
//! let mut circuit = Circuit::new();
//! let a = circuit.add_node("a")?;
//! let b = circuit.add_node("b")?;
//! let c = circuit.add_node("c")?;
//! circuit.add_resistor(a, c, 1.0)?;
//! circuit.add_resistor(c, b, 1.0)?;
//! circuit.add_battery(a, b, 1.0)?;
//!
//! let mut runner = TrialRunner::new();
//! runner.set_initial_circuit(circuit);
//! runner.set_measured_edge(a, b);
//! runner.set_deletion_mode(DeletionMode::annihilation(1));
//!
//! let result = runner.run_trial()?;
//! println!("{}", serde_json::to_string(&result).unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! ## Simulation Method
//!
//! The solver uses the mesh-current (loop-current) method. For each trial
//! step:
//!
//! 1. The selection policy picks the next nodes to defect
//! 2. The deletion policy removes them or rewrites nearby resistances
//! 3. If the topology changed, the cycle basis is repaired (surviving
//!    cycles are reused; the spanning-forest generator tops up the rank)
//! 4. Kirchhoff's voltage law over the basis yields `R * i_loop = v_loop`,
//!    solved by dense LU, and the measured-edge branch current is recorded
//!
//! A disconnected measured edge is a defined state with current exactly 0,
//! not a solver failure.

pub mod circuit;
pub mod cyclebasis;
pub mod error;
pub mod solver;
pub mod trial;

// Re-export main types for convenience
pub use circuit::{Circuit, EdgeAttr, EdgeId, NodeId};
pub use cyclebasis::{Cycle, CycleBasis};
pub use error::{DefectError, Result};
pub use solver::MeshSolution;
pub use trial::{
    run_trials, DeletionMode, RunOptions, RunReport, SelectionMode, TrialResult, TrialRunner,
};
