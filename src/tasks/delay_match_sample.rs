//! Delayed match-to-sample.
//!
//! Each trial shows a sample stimulus, holds it through a delay, then shows a
//! test stimulus. After the test the agent reports whether the two matched.
//! The fixation cue (channel 0) stays on until the decision epoch, where its
//! disappearance is the go signal.
//!
//! Timeline with the default timing at `dt = 100`:
//!
//! ```text
//! fixation | sample | delay      | test  | decision
//! 0..3     | 3..8   | 8..18      | 18..23| 23..32
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ConfigError, DmsConfig};
use crate::env::{Action, Env, Step, StepInfo};
use crate::epoch::{Anchor, EpochEnv, EpochId, EpochSchedule};
use crate::prng::Prng;
use crate::stats::{TrialOutcome, TrialStats};

pub const FIXATION: &str = "fixation";
pub const SAMPLE: &str = "sample";
pub const DELAY: &str = "delay";
pub const TEST: &str = "test";
pub const DECISION: &str = "decision";

/// Ground-truth label: test equals sample.
pub const MATCH: u32 = 1;
/// Ground-truth label: test is the complementary stimulus.
pub const NON_MATCH: u32 = 2;

pub const CHOICES: [u32; 2] = [MATCH, NON_MATCH];
pub const STIMULI: [u32; 2] = [1, 2];

/// Observation channels: fixation cue plus one evidence channel per stimulus.
pub const OBS_SIZE: usize = 3;
pub const ACTION_SIZE: usize = 3;

const CUE_ONLY: [f32; OBS_SIZE] = [1.0, 0.0, 0.0];

/// Reference information about a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskMetadata {
    pub paper_link: &'static str,
    pub paper_name: &'static str,
    /// Default epoch durations in milliseconds, in timeline order.
    pub default_timing_ms: [(&'static str, f32); 5],
}

pub const METADATA: TaskMetadata = TaskMetadata {
    paper_link: "https://www.jneurosci.org/content/jneuro/16/16/5154.full.pdf",
    paper_name: "Neural Mechanisms of Visual Working Memory in Prefrontal Cortex of the Macaque",
    default_timing_ms: [
        (FIXATION, 300.0),
        (SAMPLE, 500.0),
        (DELAY, 1000.0),
        (TEST, 500.0),
        (DECISION, 900.0),
    ],
};

/// Action that answers a ground-truth label. Label 1 maps to choice A (-1),
/// label 2 to choice B (+1); anything else has no correct action.
pub fn action_for_label(label: u32) -> Option<Action> {
    match label {
        MATCH => Some(Action::Match),
        NON_MATCH => Some(Action::NonMatch),
        _ => None,
    }
}

/// Test stimulus implied by a sample and a ground truth.
///
/// Match keeps the sample, anything else takes the complement `3 - sample`.
pub fn test_stimulus(ground_truth: u32, sample: u32) -> u32 {
    if ground_truth == MATCH {
        sample
    } else {
        3u32.wrapping_sub(sample)
    }
}

/// Random draws of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trial {
    pub ground_truth: u32,
    pub sample: u32,
    /// Derived from `ground_truth` and `sample`.
    pub test: u32,
}

/// Caller-supplied values that replace the random draws of the next trial.
///
/// Values are used as given; out-of-set labels are not rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialOverrides {
    pub ground_truth: Option<u32>,
    pub sample: Option<u32>,
}

impl TrialOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ground_truth(mut self, label: u32) -> Self {
        self.ground_truth = Some(label);
        self
    }

    pub fn sample(mut self, stimulus: u32) -> Self {
        self.sample = Some(stimulus);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DelayedMatchToSample {
    config: DmsConfig,
    sigma_dt: f32,
    rng: Prng,
    epochs: EpochEnv,
    trial: Trial,
    trial_count: u64,
    stats: TrialStats,
}

impl Default for DelayedMatchToSample {
    fn default() -> Self {
        Self::new(DmsConfig::default())
    }
}

impl DelayedMatchToSample {
    /// Build the environment and generate its first trial.
    ///
    /// An invalid config is logged and repaired with [`DmsConfig::sanitized`].
    /// Use [`DelayedMatchToSample::try_new`] to reject it instead.
    pub fn new(config: DmsConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid config, falling back to defaults for bad fields");
                config.sanitized()
            }
        };
        Self::build(config)
    }

    /// Like [`DelayedMatchToSample::new`], but fails on an invalid config.
    pub fn try_new(config: DmsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DmsConfig) -> Self {
        let mut env = Self {
            sigma_dt: config.sigma_dt(),
            rng: Prng::new(config.seed),
            config,
            epochs: EpochEnv::new(OBS_SIZE),
            trial: Trial {
                ground_truth: MATCH,
                sample: 1,
                test: 1,
            },
            trial_count: 0,
            stats: TrialStats::new(),
        };
        env.new_trial(TrialOverrides::default());
        env
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn trial(&self) -> &Trial {
        &self.trial
    }

    pub fn epochs(&self) -> &EpochEnv {
        &self.epochs
    }

    pub fn stats(&self) -> &TrialStats {
        &self.stats
    }

    pub fn sigma_dt(&self) -> f32 {
        self.sigma_dt
    }

    pub fn trial_count(&self) -> u64 {
        self.trial_count
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.state()
    }

    fn draw(&mut self, set: &[u32]) -> u32 {
        self.rng.choose(set).copied().unwrap_or_default()
    }

    /// Generate the next trial: draws, timeline, observations, ground truth.
    ///
    /// Rewinds the clock to the first step of the new trial.
    pub fn new_trial(&mut self, overrides: TrialOverrides) -> &Trial {
        // Always draw both values so a seed yields the same stream with or without overrides.
        let drawn_gt = self.draw(&CHOICES);
        let drawn_sample = self.draw(&STIMULI);

        let ground_truth = overrides.ground_truth.unwrap_or(drawn_gt);
        let sample = overrides.sample.unwrap_or(drawn_sample);
        let test = test_stimulus(ground_truth, sample);
        self.trial = Trial {
            ground_truth,
            sample,
            test,
        };

        let dt = self.config.dt;
        let timing = &self.config.timing;
        let rng = &mut self.rng;
        let mut b = EpochSchedule::builder();
        let fixation = b.add_epoch(FIXATION, timing.fixation.steps(dt, rng), Anchor::Start);
        let sample_ep = b.add_epoch(SAMPLE, timing.sample.steps(dt, rng), Anchor::After(fixation));
        let delay = b.add_epoch(DELAY, timing.delay.steps(dt, rng), Anchor::After(sample_ep));
        let test_ep = b.add_epoch(TEST, timing.test.steps(dt, rng), Anchor::After(delay));
        let decision = b.add_epoch(DECISION, timing.decision.steps(dt, rng), Anchor::After(test_ep));
        self.epochs.begin_trial(b.finish(decision));

        self.epochs.set_ob(fixation, &CUE_ONLY);
        self.write_stimulus(sample_ep, sample);
        self.write_stimulus(test_ep, test);
        self.epochs.set_ob(delay, &CUE_ONLY);
        self.epochs.set_groundtruth(decision, ground_truth);

        self.trial_count += 1;
        debug!(
            trial = self.trial_count,
            ground_truth,
            sample,
            test,
            steps = self.epochs.total_steps(),
            "new trial"
        );
        &self.trial
    }

    /// Cue on, stimulus channel on, then independent Gaussian noise on both
    /// evidence channels of every row.
    fn write_stimulus(&mut self, id: EpochId, stimulus: u32) {
        let sigma_dt = self.sigma_dt;
        let rng = &mut self.rng;
        let mut ob = self.epochs.view_ob(id);
        ob.fill_channel(0, 1.0);
        ob.fill_channel(stimulus as usize, 1.0);
        for row in ob.rows_mut() {
            for v in &mut row[1..] {
                *v += rng.next_normal() * sigma_dt;
            }
        }
    }

    /// Score `action` at the current time step without touching any state.
    ///
    /// A decision-epoch response ends the trial; fixating through the whole
    /// decision epoch never does here (see [`DelayedMatchToSample::step`]).
    pub fn evaluate(&self, action: Action) -> Step {
        let rewards = &self.config.rewards;
        let gt = self.epochs.gt_now();
        let mut new_trial = false;
        let mut reward = 0.0;
        let mut outcome = None;

        if self.epochs.in_epoch(FIXATION) {
            if !action.is_fixate() {
                new_trial = self.config.abort;
                reward = rewards.aborted;
                if new_trial {
                    outcome = Some(TrialOutcome::Aborted);
                }
            }
        } else if self.epochs.in_epoch(DECISION) && !action.is_fixate() {
            new_trial = true;
            if action_for_label(gt) == Some(action) {
                reward = rewards.correct;
                outcome = Some(TrialOutcome::Correct);
            } else {
                reward = rewards.fail;
                outcome = Some(TrialOutcome::Incorrect);
            }
        }

        Step {
            observation: self.epochs.obs_now().to_vec(),
            reward,
            terminated: false,
            info: StepInfo {
                new_trial,
                gt,
                epoch: self.epochs.current_epoch().map(str::to_string),
                outcome,
            },
        }
    }

    /// Evaluate `action`, then advance the clock by one step.
    ///
    /// When the last step of the trial passes without a response the trial is
    /// closed as a miss. Whenever `new_trial` is reported the outcome is
    /// recorded and the next trial is generated; the returned observation is
    /// what the agent sees at its next step.
    pub fn step(&mut self, action: Action) -> Step {
        let mut step = self.evaluate(action);

        let out_of_time = self.epochs.advance();
        if out_of_time && !step.info.new_trial {
            step.info.new_trial = true;
            step.reward += self.config.rewards.miss;
            step.info.outcome = Some(TrialOutcome::Missed);
        }

        if step.info.new_trial {
            let outcome = step.info.outcome.unwrap_or(TrialOutcome::Missed);
            debug!(
                trial = self.trial_count,
                ?outcome,
                reward = step.reward,
                t = self.epochs.t_ind(),
                "trial ended"
            );
            self.stats.record(outcome);
            self.new_trial(TrialOverrides::default());
        }

        step.observation = self.epochs.obs_now().to_vec();
        step
    }

    /// Start a fresh trial and return its first observation.
    pub fn reset(&mut self) -> Vec<f32> {
        self.new_trial(TrialOverrides::default());
        self.epochs.obs_now().to_vec()
    }
}

impl Env for DelayedMatchToSample {
    fn reset(&mut self) -> Vec<f32> {
        DelayedMatchToSample::reset(self)
    }

    fn step(&mut self, action: i32) -> Step {
        DelayedMatchToSample::step(self, Action::from_code(action))
    }

    fn obs_size(&self) -> usize {
        OBS_SIZE
    }

    fn action_size(&self) -> usize {
        ACTION_SIZE
    }
}
