//! Multi-trial orchestration.
//!
//! Trials are independent units of work: each runs to completion on its
//! assigned worker against its own deep copy of the runner's initial
//! state. Trial `i` always receives seed `base_seed + i`, so any single
//! trial is reproducible in isolation even though wall-clock interleaving
//! is not. Results are aggregated into a single list ordered by trial
//! index regardless of completion order, and one trial's failure is
//! recorded in place without disturbing its siblings.

use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DefectError, Result};

use super::runner::TrialRunner;
use super::StepRecord;

/// Options for a batch of trials.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of trials to run in total.
    pub trials: usize,
    /// Number of trials to run in parallel.
    pub jobs: usize,
    /// Seed for trial 0; trial `i` runs with `base_seed + i`.
    pub base_seed: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            trials: 1,
            jobs: 1,
            base_seed: unix_now(),
        }
    }
}

/// Outcome of one trial, tagged with its index and seed.
#[derive(Debug, Clone, Serialize)]
pub struct TrialOutcome {
    /// Index in input order.
    pub trial: usize,
    /// The derived seed the trial ran with.
    pub seed: u64,
    #[serde(flatten)]
    pub status: TrialStatus,
}

/// Whether a trial completed or failed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TrialStatus {
    /// The trial ran to termination.
    Completed {
        /// Per-step records, one measured current per executed step.
        steps: StepRecord,
    },
    /// The trial aborted with a fatal error. Siblings are unaffected.
    Failed {
        /// Rendered error message.
        error: String,
    },
}

/// Aggregated result of a batch of trials, serializable as the top-level
/// JSON output document.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Selection-policy metadata.
    pub selection_mode: Value,
    /// Deletion-policy metadata.
    pub defect_mode: Value,
    /// Worker count the batch ran with.
    pub process_count: usize,
    /// Unix timestamp when the batch started.
    pub time_started: u64,
    /// Unix timestamp when the batch finished.
    pub time_finished: u64,
    /// One outcome per trial, ordered by trial index.
    pub trials: Vec<TrialOutcome>,
}

/// Run a batch of independent trials.
///
/// The runner is shared read-only across workers; each trial deep-copies
/// the initial state on its own worker, bounding peak memory to one live
/// copy per concurrently running trial.
pub fn run_trials(runner: &TrialRunner, options: &RunOptions) -> Result<RunReport> {
    let time_started = unix_now();

    let one = |trial: usize| -> TrialOutcome {
        let seed = options.base_seed.wrapping_add(trial as u64);
        let status = match runner.run_trial_seeded(seed) {
            Ok(result) => TrialStatus::Completed {
                steps: result.steps,
            },
            Err(err) => TrialStatus::Failed {
                error: err.in_trial(trial).to_string(),
            },
        };
        TrialOutcome {
            trial,
            seed,
            status,
        }
    };

    let trials: Vec<TrialOutcome> = if options.jobs <= 1 {
        (0..options.trials).map(one).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|e| DefectError::trial_setup(format!("worker pool: {e}")))?;
        pool.install(|| (0..options.trials).into_par_iter().map(one).collect())
    };

    Ok(RunReport {
        selection_mode: runner.selection_info(),
        defect_mode: runner.deletion_info(),
        process_count: options.jobs,
        time_started,
        time_finished: unix_now(),
        trials,
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, NodeId};
    use crate::trial::{DeletionMode, SelectionMode};

    fn template() -> TrialRunner {
        let mut g = Circuit::new();
        let ids: Vec<Vec<NodeId>> = (0..4)
            .map(|r| {
                (0..4)
                    .map(|c| g.add_node(format!("g{r},{c}")).unwrap())
                    .collect()
            })
            .collect();
        for r in 0..4 {
            for c in 0..4 {
                if c + 1 < 4 {
                    g.add_resistor(ids[r][c], ids[r][c + 1], 1.0).unwrap();
                }
                if r + 1 < 4 {
                    g.add_resistor(ids[r][c], ids[r + 1][c], 1.0).unwrap();
                }
            }
        }
        let bot = ids[0][0];
        let top = ids[3][3];
        g.add_battery(bot, top, 1.0).unwrap();

        let mut runner = TrialRunner::new();
        runner.set_initial_circuit(g);
        runner.set_measured_edge(bot, top);
        runner.set_deletion_mode(DeletionMode::multiply_resistance(100.0, false, 1));
        runner
    }

    #[test]
    fn test_sequential_batch_ordered() {
        let runner = template();
        let options = RunOptions {
            trials: 4,
            jobs: 1,
            base_seed: 1000,
        };
        let report = run_trials(&runner, &options).unwrap();
        assert_eq!(report.trials.len(), 4);
        for (i, outcome) in report.trials.iter().enumerate() {
            assert_eq!(outcome.trial, i);
            assert_eq!(outcome.seed, 1000 + i as u64);
            assert!(matches!(outcome.status, TrialStatus::Completed { .. }));
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let runner = template();
        let sequential = run_trials(
            &runner,
            &RunOptions {
                trials: 6,
                jobs: 1,
                base_seed: 7,
            },
        )
        .unwrap();
        let parallel = run_trials(
            &runner,
            &RunOptions {
                trials: 6,
                jobs: 3,
                base_seed: 7,
            },
        )
        .unwrap();

        for (s, p) in sequential.trials.iter().zip(&parallel.trials) {
            assert_eq!(s.trial, p.trial);
            assert_eq!(s.seed, p.seed);
            match (&s.status, &p.status) {
                (
                    TrialStatus::Completed { steps: a },
                    TrialStatus::Completed { steps: b },
                ) => assert_eq!(a.current, b.current),
                _ => panic!("trial {} did not complete in both runs", s.trial),
            }
        }
    }

    #[test]
    fn test_failed_trial_is_isolated_and_attributed() {
        // a runner with no configuration fails every trial
        let runner = TrialRunner::new();
        let report = run_trials(
            &runner,
            &RunOptions {
                trials: 2,
                jobs: 1,
                base_seed: 0,
            },
        )
        .unwrap();
        assert_eq!(report.trials.len(), 2);
        for (i, outcome) in report.trials.iter().enumerate() {
            match &outcome.status {
                TrialStatus::Failed { error } => {
                    assert!(error.contains(&format!("Trial {i}")));
                }
                _ => panic!("expected failure"),
            }
        }
    }

    #[test]
    fn test_report_serializes_to_contract_shape() {
        let mut runner = template();
        runner.set_selection_mode(SelectionMode::uniform());
        runner.set_step_limit(2);
        let report = run_trials(
            &runner,
            &RunOptions {
                trials: 1,
                jobs: 1,
                base_seed: 3,
            },
        )
        .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["selection_mode"]["mode"], "uniform");
        assert_eq!(json["process_count"], 1);
        let current = &json["trials"][0]["steps"]["current"];
        assert!(current.is_array());
        assert_eq!(current.as_array().unwrap().len(), 2);
    }
}
