#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::stats::TrialStats;
use crate::tasks::{DelayedMatchToSample, Trial};

/// One row of the epoch table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpochRow {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// A read-only snapshot of the running trial.
///
/// Observers cannot steer the environment; snapshotting allocates and is
/// meant for logging and inspection, not the step loop.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialSnapshot {
    pub trial_index: u64,
    pub trial: Trial,
    pub t_ind: usize,
    pub total_steps: usize,
    pub dt: f32,
    pub current_epoch: Option<String>,
    pub epochs: Vec<EpochRow>,
    pub stats: TrialStats,
}

pub struct EnvAdapter<'a> {
    env: &'a DelayedMatchToSample,
}

impl<'a> EnvAdapter<'a> {
    pub fn new(env: &'a DelayedMatchToSample) -> Self {
        Self { env }
    }

    pub fn snapshot(&self) -> TrialSnapshot {
        let epochs = self.env.epochs();
        TrialSnapshot {
            trial_index: self.env.trial_count(),
            trial: *self.env.trial(),
            t_ind: epochs.t_ind(),
            total_steps: epochs.total_steps(),
            dt: self.env.config().dt,
            current_epoch: epochs.current_epoch().map(str::to_string),
            epochs: epochs
                .schedule()
                .iter()
                .map(|e| EpochRow {
                    name: e.name.clone(),
                    start: e.start,
                    end: e.end,
                })
                .collect(),
            stats: self.env.stats().clone(),
        }
    }

    /// Observation rows of the current trial, one `Vec` per time step.
    pub fn observation_rows(&self) -> Vec<Vec<f32>> {
        let epochs = self.env.epochs();
        (0..epochs.total_steps())
            .map(|t| epochs.ob_at(t).to_vec())
            .collect()
    }
}
