//! Trial execution: policies, the stepping runner, and orchestration.

mod deletion;
mod run;
mod runner;
mod selection;

pub use deletion::{DeletionMode, DeletionOutcome};
pub use run::{run_trials, RunOptions, RunReport, TrialOutcome, TrialStatus};
pub use runner::{TrialPhase, TrialRunner, TrialState};
pub use selection::{SelectionMode, DEFAULT_NEIGHBOR_TIERS};

use serde::{Deserialize, Serialize};

/// Result record of one trial: the JSON contract is
/// `{"steps": {"current": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Per-step records.
    pub steps: StepRecord,
}

/// Ordered per-step measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Measured current after each executed step, in step order. The
    /// length equals the number of steps actually executed.
    pub current: Vec<f64>,
}

impl TrialResult {
    /// Wrap a recorded current history.
    pub fn from_currents(current: Vec<f64>) -> Self {
        Self {
            steps: StepRecord { current },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_json_contract() {
        let result = TrialResult::from_currents(vec![1.5, 0.5, 0.0]);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"steps":{"current":[1.5,0.5,0.0]}}"#);
    }
}
