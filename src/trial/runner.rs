//! Trial execution.
//!
//! A [`TrialRunner`] is a reusable configuration template: it holds the
//! initial circuit, cycle basis, eligible-node set and policies, and
//! [`TrialRunner::run_trial`] executes one full trial against a deep copy
//! of that state. Templates are immutable during execution, so many trials
//! can run from one runner concurrently.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use crate::circuit::{validate_circuit, Circuit, NodeId};
use crate::cyclebasis::{self, CycleBasis};
use crate::error::{DefectError, Result};
use crate::solver;

use super::deletion::DeletionMode;
use super::selection::SelectionMode;
use super::TrialResult;

/// Lifecycle of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    /// Initial state set, no steps taken.
    Ready,
    /// Zero or more steps executed.
    Stepping,
    /// Terminal: step limit reached, choices exhausted, or disconnection
    /// detected with end-on-disconnect enabled.
    Finished,
}

/// Live state of one trial in progress.
///
/// Created once per trial from the runner's snapshot, mutated step by
/// step, and discarded after producing its result record.
#[derive(Debug)]
pub struct TrialState {
    circuit: Circuit,
    basis: CycleBasis,
    choices: Vec<NodeId>,
    choice_set: HashSet<NodeId>,
    defects: HashSet<NodeId>,
    initial_neighbors: HashMap<NodeId, Vec<NodeId>>,
    phase: TrialPhase,
    history: Vec<f64>,
}

impl TrialState {
    /// The live circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Remaining eligible nodes, in a stable order.
    pub fn choices(&self) -> &[NodeId] {
        &self.choices
    }

    /// Whether a node is still eligible for selection.
    pub fn is_choice(&self, node: NodeId) -> bool {
        self.choice_set.contains(&node)
    }

    /// How many of the node's *initial* neighbors have become defects.
    pub fn defect_neighbor_count(&self, node: NodeId) -> usize {
        self.initial_neighbors
            .get(&node)
            .map_or(0, |ns| ns.iter().filter(|v| self.defects.contains(v)).count())
    }

    /// Measured currents recorded so far, one per executed step.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    fn mark_defect(&mut self, node: NodeId) {
        if self.choice_set.remove(&node) {
            if let Some(pos) = self.choices.iter().position(|&v| v == node) {
                self.choices.remove(pos);
            }
        }
        self.defects.insert(node);
    }
}

#[cfg(test)]
impl TrialState {
    /// Mid-trial snapshot with the given nodes already marked as defects,
    /// for selection-policy tests that need one without running a trial.
    pub(crate) fn with_defects(circuit: Circuit, defects: &[NodeId]) -> Self {
        let defects: HashSet<NodeId> = defects.iter().copied().collect();
        let choices: Vec<NodeId> = circuit
            .nodes()
            .filter(|v| !defects.contains(v))
            .collect();
        let choice_set = choices.iter().copied().collect();
        let initial_neighbors = circuit
            .nodes()
            .map(|v| (v, circuit.neighbors(v).map(|(u, _)| u).collect()))
            .collect();
        Self {
            circuit,
            basis: CycleBasis::default(),
            choices,
            choice_set,
            defects,
            initial_neighbors,
            phase: TrialPhase::Stepping,
            history: Vec::new(),
        }
    }
}

/// Configuration template for defect trials.
#[derive(Debug, Clone, Default)]
pub struct TrialRunner {
    circuit: Option<Circuit>,
    cycles: Option<CycleBasis>,
    choices: Option<Vec<NodeId>>,
    measured_edge: Option<(NodeId, NodeId)>,
    selection_mode: SelectionMode,
    deletion_mode: Option<DeletionMode>,
    step_limit: Option<usize>,
    defects_per_step: usize,
    end_on_disconnect: bool,
    seed: Option<u64>,
}

impl TrialRunner {
    /// Create a runner with default settings: one defect per step,
    /// uniform selection, end on disconnect, no step limit.
    pub fn new() -> Self {
        Self {
            defects_per_step: 1,
            end_on_disconnect: true,
            ..Default::default()
        }
    }

    /// Set the initial circuit.
    pub fn set_initial_circuit(&mut self, circuit: Circuit) {
        self.circuit = Some(circuit);
    }

    /// Set the initial cycle basis. When unset, a spanning-forest basis is
    /// derived at trial start. A supplied basis that does not span the
    /// circuit's cycle space fails the trial at start; it would otherwise
    /// record understated currents with no other symptom.
    pub fn set_initial_cycles(&mut self, cycles: CycleBasis) {
        self.cycles = Some(cycles);
    }

    /// Set the initially eligible node set. When unset, every node is
    /// eligible. The measured edge's endpoints are always excluded.
    pub fn set_initial_choices(&mut self, choices: impl IntoIterator<Item = NodeId>) {
        self.choices = Some(choices.into_iter().collect());
    }

    /// Designate the measured edge by its endpoints.
    pub fn set_measured_edge(&mut self, a: NodeId, b: NodeId) {
        self.measured_edge = Some((a, b));
    }

    /// Set the node selection policy.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection_mode = mode;
    }

    /// Set the node deletion policy.
    pub fn set_deletion_mode(&mut self, mode: DeletionMode) {
        self.deletion_mode = Some(mode);
    }

    /// Limit the number of steps per trial.
    pub fn set_step_limit(&mut self, steps: usize) {
        self.step_limit = Some(steps);
    }

    /// Remove the step limit.
    pub fn unset_step_limit(&mut self) {
        self.step_limit = None;
    }

    /// Number of defects introduced per step.
    pub fn set_defects_per_step(&mut self, count: usize) {
        self.defects_per_step = count.max(1);
    }

    /// Whether a trial ends at the step that disconnects the measured
    /// edge's endpoints (that step's zero current is still recorded).
    pub fn set_end_on_disconnect(&mut self, end: bool) {
        self.end_on_disconnect = end;
    }

    /// Fix the random seed used by `run_trial`. Unset runners draw a
    /// fresh seed per trial.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Selection-policy metadata for run reports.
    pub fn selection_info(&self) -> Value {
        self.selection_mode.info()
    }

    /// Deletion-policy metadata for run reports.
    pub fn deletion_info(&self) -> Value {
        self.deletion_mode
            .as_ref()
            .map(DeletionMode::info)
            .unwrap_or(Value::Null)
    }

    /// Run one full trial.
    pub fn run_trial(&self) -> Result<TrialResult> {
        let seed = self.seed.unwrap_or_else(rand::random);
        self.run_trial_seeded(seed)
    }

    /// Run one full trial with an explicit seed.
    ///
    /// The runner itself is not mutated: the trial operates on a deep copy
    /// of the initial circuit, basis and choice set.
    pub fn run_trial_seeded(&self, seed: u64) -> Result<TrialResult> {
        let circuit = self
            .circuit
            .clone()
            .ok_or_else(|| DefectError::trial_setup("initial circuit not set"))?;
        let (ma, mb) = self
            .measured_edge
            .ok_or_else(|| DefectError::trial_setup("measured edge not set"))?;
        let deletion = self
            .deletion_mode
            .clone()
            .ok_or_else(|| DefectError::trial_setup("deletion mode not set"))?;

        let measured = circuit.edge_between(ma, mb).ok_or_else(|| {
            DefectError::edge_not_found(
                circuit.node_label(ma).unwrap_or("?"),
                circuit.node_label(mb).unwrap_or("?"),
            )
        })?;
        validate_circuit(&circuit, measured)?;

        let basis = match &self.cycles {
            Some(cycles) => {
                cyclebasis::ensure_full_rank(&circuit, cycles)?;
                cycles.clone()
            }
            None => cyclebasis::fallback_basis(&circuit)?,
        };

        // Eligible nodes: configured choices (or every node), minus the
        // measured endpoints, live only, first occurrence wins.
        let configured: Vec<NodeId> = match &self.choices {
            Some(choices) => choices.clone(),
            None => circuit.nodes().collect(),
        };
        let mut choices = Vec::with_capacity(configured.len());
        let mut choice_set = HashSet::with_capacity(configured.len());
        for v in configured {
            if v == ma || v == mb || !circuit.contains_node(v) {
                continue;
            }
            if choice_set.insert(v) {
                choices.push(v);
            }
        }

        // Everything outside the choice set is protected from removal.
        let protected: HashSet<NodeId> = circuit
            .nodes()
            .filter(|v| !choice_set.contains(v))
            .collect();

        let initial_neighbors: HashMap<NodeId, Vec<NodeId>> = circuit
            .nodes()
            .map(|v| (v, circuit.neighbors(v).map(|(u, _)| u).collect()))
            .collect();

        let mut state = TrialState {
            circuit,
            basis,
            choices,
            choice_set,
            defects: HashSet::new(),
            initial_neighbors,
            phase: TrialPhase::Ready,
            history: Vec::new(),
        };
        let mut selection = self.selection_mode.clone();
        let mut rng = StdRng::seed_from_u64(seed);

        state.phase = TrialPhase::Stepping;
        loop {
            if let Some(limit) = self.step_limit {
                if state.history.len() >= limit {
                    break;
                }
            }
            if state.choices.is_empty() {
                break;
            }

            let targets = selection.select(&state, self.defects_per_step, &mut rng);
            if targets.is_empty() {
                break;
            }
            let final_step = targets.len() < self.defects_per_step;

            let mut topology_changed = false;
            for target in targets {
                state.mark_defect(target);
                let outcome =
                    deletion.apply(&mut state.circuit, target, &protected, measured)?;
                for removed in outcome.removed_nodes {
                    state.mark_defect(removed);
                }
                topology_changed |= outcome.topology_changed;
            }

            if topology_changed {
                state.basis = cyclebasis::rebuild(&state.circuit, &state.basis)?;
            }

            let current = solver::measured_current(&state.circuit, &state.basis, measured)?;
            state.history.push(current);

            if self.end_on_disconnect
                && !state.circuit.connected_excluding(ma, mb, measured)
            {
                break;
            }
            if final_step {
                break;
            }
        }
        state.phase = TrialPhase::Finished;

        Ok(TrialResult::from_currents(state.history))
    }
}
