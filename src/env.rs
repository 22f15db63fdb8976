#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::stats::TrialOutcome;

/// Discrete action alphabet. Raw codes are asymmetric: fixate = 0,
/// choice A = -1, choice B = +1.
///
/// Any other code is kept as [`Action::Other`] and counts as "not fixating".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    Fixate,
    /// Choice A.
    Match,
    /// Choice B.
    NonMatch,
    Other(i32),
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Fixate, Action::Match, Action::NonMatch];

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Action::Fixate,
            -1 => Action::Match,
            1 => Action::NonMatch,
            other => Action::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Action::Fixate => 0,
            Action::Match => -1,
            Action::NonMatch => 1,
            Action::Other(c) => c,
        }
    }

    pub fn is_fixate(self) -> bool {
        matches!(self, Action::Fixate)
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Fixate => "fixate",
            Action::Match => "match",
            Action::NonMatch => "non_match",
            Action::Other(_) => "other",
        }
    }
}

/// Diagnostics returned with every step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepInfo {
    /// The driving loop should start the next trial.
    pub new_trial: bool,
    /// Ground-truth label active at this step (0 = none).
    pub gt: u32,
    /// Epoch the step was evaluated in.
    pub epoch: Option<String>,
    /// How the trial ended, set together with `new_trial`.
    pub outcome: Option<TrialOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Catastrophic termination. Always false for this task family; trial
    /// ends are reported through [`StepInfo::new_trial`].
    pub terminated: bool,
    pub info: StepInfo,
}

/// Gym-style environment interface driven one action at a time.
pub trait Env {
    /// Rewind to the start of a fresh trial and return the first observation.
    fn reset(&mut self) -> Vec<f32>;

    /// Apply one raw action code and advance one time step.
    fn step(&mut self, action: i32) -> Step;

    /// Size of the observation vector.
    fn obs_size(&self) -> usize;

    /// Number of discrete actions.
    fn action_size(&self) -> usize;
}
