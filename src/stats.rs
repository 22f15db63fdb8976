use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialOutcome {
    Correct,
    Incorrect,
    /// Fixation broken with `abort` enabled.
    Aborted,
    /// No response before the trial ran out of steps.
    Missed,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialStats {
    pub correct: u32,
    pub incorrect: u32,
    pub aborted: u32,
    pub missed: u32,
    pub trials: u32,
    /// Correctness of the last 200 answered trials.
    pub recent: VecDeque<bool>,
    pub learning_at_trial: Option<u32>,
    pub learned_at_trial: Option<u32>,
    pub mastered_at_trial: Option<u32>,
}

const RECENT_WINDOW: usize = 200;

impl TrialStats {
    pub fn new() -> Self {
        Self {
            correct: 0,
            incorrect: 0,
            aborted: 0,
            missed: 0,
            trials: 0,
            recent: VecDeque::with_capacity(RECENT_WINDOW + 1),
            learning_at_trial: None,
            learned_at_trial: None,
            mastered_at_trial: None,
        }
    }

    fn update_milestones(&mut self) {
        // Gate on a minimum number of trials to avoid “instant” mastery on tiny samples.
        if self.trials < 20 {
            return;
        }

        let r = self.last_100_rate();
        if self.learning_at_trial.is_none() && r >= 0.70 {
            self.learning_at_trial = Some(self.trials);
        }
        if self.learned_at_trial.is_none() && r >= 0.85 {
            self.learned_at_trial = Some(self.trials);
        }
        if self.mastered_at_trial.is_none() && r >= 0.95 {
            self.mastered_at_trial = Some(self.trials);
        }
    }

    pub fn record(&mut self, outcome: TrialOutcome) {
        self.trials += 1;
        let is_correct = match outcome {
            TrialOutcome::Correct => {
                self.correct += 1;
                true
            }
            TrialOutcome::Incorrect => {
                self.incorrect += 1;
                false
            }
            // Unanswered trials do not move accuracy.
            TrialOutcome::Aborted => {
                self.aborted += 1;
                return;
            }
            TrialOutcome::Missed => {
                self.missed += 1;
                return;
            }
        };

        self.recent.push_back(is_correct);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        self.update_milestones();
    }

    pub fn answered(&self) -> u32 {
        self.correct + self.incorrect
    }

    pub fn accuracy(&self) -> f32 {
        let total = self.answered();
        if total == 0 {
            0.5
        } else {
            self.correct as f32 / total as f32
        }
    }

    pub fn recent_rate(&self) -> f32 {
        if self.recent.is_empty() {
            return 0.5;
        }
        let correct_count = self.recent.iter().filter(|&&x| x).count();
        correct_count as f32 / self.recent.len() as f32
    }

    pub fn last_100_rate(&self) -> f32 {
        if self.recent.len() < 10 {
            return self.recent_rate();
        }
        let start = self.recent.len().saturating_sub(100);
        let window = self.recent.len() - start;
        let correct_count = self.recent.iter().skip(start).filter(|&&x| x).count();
        correct_count as f32 / window as f32
    }
}

impl Default for TrialStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanswered_trials_do_not_count_towards_accuracy() {
        let mut s = TrialStats::new();
        s.record(TrialOutcome::Correct);
        s.record(TrialOutcome::Missed);
        s.record(TrialOutcome::Aborted);
        s.record(TrialOutcome::Incorrect);
        assert_eq!(s.trials, 4);
        assert_eq!(s.answered(), 2);
        assert_eq!(s.accuracy(), 0.5);
        assert_eq!(s.recent.len(), 2);
    }

    #[test]
    fn milestones_wait_for_twenty_trials() {
        let mut s = TrialStats::new();
        for _ in 0..19 {
            s.record(TrialOutcome::Correct);
        }
        assert!(s.mastered_at_trial.is_none());
        s.record(TrialOutcome::Correct);
        assert_eq!(s.learning_at_trial, Some(20));
        assert_eq!(s.learned_at_trial, Some(20));
        assert_eq!(s.mastered_at_trial, Some(20));
    }

    #[test]
    fn recent_window_is_bounded() {
        let mut s = TrialStats::new();
        for i in 0..450 {
            s.record(if i % 2 == 0 {
                TrialOutcome::Correct
            } else {
                TrialOutcome::Incorrect
            });
        }
        assert_eq!(s.recent.len(), RECENT_WINDOW);
        assert!((s.last_100_rate() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn window_drops_oldest_answers_first() {
        let mut s = TrialStats::new();
        for _ in 0..RECENT_WINDOW {
            s.record(TrialOutcome::Incorrect);
        }
        for _ in 0..100 {
            s.record(TrialOutcome::Correct);
        }
        assert_eq!(s.recent.len(), RECENT_WINDOW);
        assert_eq!(s.recent.front(), Some(&false));
        assert_eq!(s.recent.back(), Some(&true));
        assert!((s.recent_rate() - 0.5).abs() < 1e-6);
        assert!((s.last_100_rate() - 1.0).abs() < 1e-6);
    }
}
