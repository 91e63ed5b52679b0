//! Error types for the defect-trial simulator.
//!
//! This module provides a unified error type [`DefectError`] that covers
//! all error conditions that can occur during circuit construction, cycle
//! basis derivation, network solving, and trial execution.
//!
//! A disconnected measured edge is *not* an error: the measured current is
//! defined to be exactly zero in that state.

use thiserror::Error;

/// Result type alias using [`DefectError`].
pub type Result<T> = std::result::Result<T, DefectError>;

/// Unified error type for all defect-trial operations.
#[derive(Error, Debug)]
pub enum DefectError {
    // ============ Circuit Construction Errors ============
    /// Node label not found in circuit
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// No edge between the given endpoints
    #[error("No edge between '{a}' and '{b}'")]
    EdgeNotFound { a: String, b: String },

    /// Duplicate node label
    #[error("Duplicate node label '{node}'")]
    DuplicateNode { node: String },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Cycle Basis Errors ============
    /// A supplied cycle references a missing node or edge
    #[error("Malformed cycle: {message}")]
    MalformedCycle { message: String },

    /// Constructed basis does not reach the required rank.
    /// Indicates a defective candidate source; never silently patched.
    #[error("Cycle basis incomplete: rank {rank} of required {required}")]
    CycleBasisIncomplete { rank: usize, required: usize },

    // ============ Solver Errors ============
    /// The mesh system is singular despite a full-rank basis.
    /// Signals a solver/builder inconsistency bug.
    #[error("Singular network - mesh system cannot be solved")]
    SingularNetwork,

    // ============ Trial Errors ============
    /// The trial runner is missing required configuration
    #[error("Trial setup error: {message}")]
    TrialSetup { message: String },

    /// A trial failed during orchestrated execution
    #[error("Trial {trial} failed: {source}")]
    TrialFailed {
        trial: usize,
        #[source]
        source: Box<DefectError>,
    },
}

impl DefectError {
    /// Create a node-not-found error.
    pub fn node_not_found(node: impl Into<String>) -> Self {
        Self::NodeNotFound { node: node.into() }
    }

    /// Create an edge-not-found error.
    pub fn edge_not_found(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self::EdgeNotFound {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Create an invalid-topology error.
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create a malformed-cycle error.
    pub fn malformed_cycle(message: impl Into<String>) -> Self {
        Self::MalformedCycle {
            message: message.into(),
        }
    }

    /// Create a trial-setup error.
    pub fn trial_setup(message: impl Into<String>) -> Self {
        Self::TrialSetup {
            message: message.into(),
        }
    }

    /// Wrap an error with the index of the trial that produced it.
    pub fn in_trial(self, trial: usize) -> Self {
        Self::TrialFailed {
            trial,
            source: Box::new(self),
        }
    }
}
