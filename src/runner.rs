//! Driving loop: one action in, one step out, until enough trials have ended.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::env::Action;
use crate::prng::Prng;
use crate::stats::TrialStats;
use crate::tasks::delay_match_sample::{action_for_label, DelayedMatchToSample, DECISION};

/// Scripted agents used to exercise the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Policy {
    /// Holds fixation, then answers the ground truth in the decision epoch.
    Oracle,
    /// Never responds.
    Fixate,
    /// Uniform over the action alphabet at every step.
    Random,
    /// Responds at the first step, breaking fixation.
    Impulsive,
}

impl Policy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oracle" => Some(Policy::Oracle),
            "fixate" => Some(Policy::Fixate),
            "random" => Some(Policy::Random),
            "impulsive" => Some(Policy::Impulsive),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Policy::Oracle => "oracle",
            Policy::Fixate => "fixate",
            Policy::Random => "random",
            Policy::Impulsive => "impulsive",
        }
    }

    fn act(self, env: &DelayedMatchToSample, rng: &mut Prng) -> Action {
        match self {
            Policy::Oracle => {
                if env.epochs().in_epoch(DECISION) {
                    action_for_label(env.epochs().gt_now()).unwrap_or(Action::Fixate)
                } else {
                    Action::Fixate
                }
            }
            Policy::Fixate => Action::Fixate,
            Policy::Random => rng.choose(&Action::ALL).copied().unwrap_or(Action::Fixate),
            Policy::Impulsive => Action::Match,
        }
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionReport {
    pub policy: Policy,
    pub trials: u32,
    pub steps: u64,
    pub total_reward: f32,
    pub mean_reward_per_trial: f32,
    pub stats: TrialStats,
}

/// Run `policy` until `trials` trials have ended (or `max_steps` steps pass).
///
/// Statistics, milestones included, cover only the trials ended during this
/// session; earlier trials of `env` are not counted.
pub fn run_session(
    env: &mut DelayedMatchToSample,
    policy: Policy,
    trials: u32,
    max_steps: u64,
    seed: u64,
) -> SessionReport {
    let mut rng = Prng::new(seed);
    let mut stats = TrialStats::new();
    let mut ended = 0u32;
    let mut steps = 0u64;
    let mut total_reward = 0.0f32;

    while ended < trials && steps < max_steps {
        let action = policy.act(env, &mut rng);
        let step = env.step(action);
        steps += 1;
        total_reward += step.reward;
        if step.info.new_trial {
            ended += 1;
            if let Some(outcome) = step.info.outcome {
                stats.record(outcome);
            }
        }
    }

    let report = SessionReport {
        policy,
        trials: ended,
        steps,
        total_reward,
        mean_reward_per_trial: if ended == 0 {
            0.0
        } else {
            total_reward / ended as f32
        },
        stats,
    };

    info!(
        policy = policy.name(),
        trials = report.trials,
        steps = report.steps,
        accuracy = report.stats.accuracy(),
        total_reward = report.total_reward,
        "session finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DmsConfig;

    #[test]
    fn oracle_answers_every_trial_correctly() {
        let mut env = DelayedMatchToSample::new(DmsConfig::default().with_seed(5));
        let r = run_session(&mut env, Policy::Oracle, 50, 100_000, 1);
        assert_eq!(r.trials, 50);
        assert_eq!(r.stats.correct, 50);
        assert_eq!(r.stats.accuracy(), 1.0);
        assert!((r.mean_reward_per_trial - 1.0).abs() < 1e-6);
        // fixation + sample + delay + test, then one decision step.
        assert_eq!(r.steps, 50 * 24);
    }

    #[test]
    fn fixate_policy_only_misses() {
        let mut env = DelayedMatchToSample::default();
        let r = run_session(&mut env, Policy::Fixate, 10, 100_000, 1);
        assert_eq!(r.stats.missed, 10);
        assert_eq!(r.stats.answered(), 0);
        assert_eq!(r.steps, 10 * 32);
        assert_eq!(r.total_reward, 0.0);
    }

    #[test]
    fn impulsive_policy_pays_abort_penalty_without_abort() {
        let mut env = DelayedMatchToSample::default();
        let r = run_session(&mut env, Policy::Impulsive, 4, 100_000, 1);
        // Three penalised fixation steps, then the first decision step answers.
        assert_eq!(r.steps, 4 * 24);
        let expected_per_trial = 3.0 * env.config().rewards.aborted;
        assert!(r.total_reward <= 4.0 * (expected_per_trial + 1.0) + 1e-5);
        assert_eq!(r.stats.aborted, 0);
        assert_eq!(r.stats.answered(), 4);
    }

    #[test]
    fn impulsive_policy_aborts_with_abort_enabled() {
        let mut env = DelayedMatchToSample::new(DmsConfig::default().with_abort(true));
        let r = run_session(&mut env, Policy::Impulsive, 6, 100_000, 1);
        assert_eq!(r.steps, 6);
        assert_eq!(r.stats.aborted, 6);
    }

    #[test]
    fn random_policy_is_near_chance_and_stops_at_step_cap() {
        let mut env = DelayedMatchToSample::default();
        let r = run_session(&mut env, Policy::Random, 1_000_000, 5_000, 3);
        assert_eq!(r.steps, 5_000);
        assert!(r.stats.trials > 0);
        // Random responders almost never reach the decision epoch silently.
        assert!(r.stats.missed < r.stats.trials);
    }

    #[test]
    fn session_stats_exclude_earlier_trials() {
        let mut env = DelayedMatchToSample::default();
        let _ = run_session(&mut env, Policy::Fixate, 3, 100_000, 1);
        let r = run_session(&mut env, Policy::Oracle, 5, 100_000, 1);
        assert_eq!(r.stats.trials, 5);
        assert_eq!(r.stats.missed, 0);
        assert_eq!(r.stats.recent.len(), 5);
        assert_eq!(env.stats().trials, 8);
    }

    #[test]
    fn session_milestones_count_from_the_session_start() {
        let mut env = DelayedMatchToSample::default();
        let _ = run_session(&mut env, Policy::Fixate, 30, 100_000, 1);
        let r = run_session(&mut env, Policy::Oracle, 50, 100_000, 1);
        assert_eq!(r.stats.learning_at_trial, Some(20));
        assert_eq!(r.stats.learned_at_trial, Some(20));
        assert_eq!(r.stats.mastered_at_trial, Some(20));
        // Lifetime stats pass the twenty-trial gate during the misses and
        // mark mastery at the first answered trial.
        assert_eq!(env.stats().mastered_at_trial, Some(31));
    }

    #[test]
    fn policy_names_round_trip() {
        for p in [Policy::Oracle, Policy::Fixate, Policy::Random, Policy::Impulsive] {
            assert_eq!(Policy::parse(p.name()), Some(p));
        }
        assert_eq!(Policy::parse("nope"), None);
    }
}
