#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prng::Prng;

/// Duration distribution for one epoch, in milliseconds.
///
/// JSON form (with the `serde` feature):
/// `{"constant": 300}`, `{"uniform": {"min": 200, "max": 400}}`,
/// `{"choice": [100, 200]}`, `{"truncated_exponential": {"mean": 300, "min": 100, "max": 900}}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EpochTiming {
    Constant(f32),
    Uniform { min: f32, max: f32 },
    Choice(Vec<f32>),
    TruncatedExponential { mean: f32, min: f32, max: f32 },
}

impl EpochTiming {
    /// Draw a duration in milliseconds. Constant timings consume no randomness.
    pub fn sample_ms(&self, rng: &mut Prng) -> f32 {
        match self {
            EpochTiming::Constant(ms) => *ms,
            EpochTiming::Uniform { min, max } => rng.gen_range_f32(*min, *max),
            EpochTiming::Choice(options) => rng.choose(options).copied().unwrap_or(0.0),
            EpochTiming::TruncatedExponential { mean, min, max } => {
                // Rejection sampling; fall back to the clamp after a bounded number of tries.
                for _ in 0..64 {
                    let u = 1.0 - rng.next_f32_01();
                    let x = -mean * u.ln();
                    if x >= *min && x <= *max {
                        return x;
                    }
                }
                mean.clamp(*min, *max)
            }
        }
    }

    /// Draw a duration and convert it to whole time steps of `dt` ms.
    pub fn steps(&self, dt: f32, rng: &mut Prng) -> usize {
        ms_to_steps(self.sample_ms(rng), dt)
    }

    /// Shortest and longest duration this timing can produce, in milliseconds.
    pub fn bounds_ms(&self) -> (f32, f32) {
        match self {
            EpochTiming::Constant(ms) => (*ms, *ms),
            EpochTiming::Uniform { min, max } => (*min, *max),
            EpochTiming::Choice(options) => {
                if options.is_empty() {
                    return (0.0, 0.0);
                }
                options
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &ms| {
                        (lo.min(ms), hi.max(ms))
                    })
            }
            EpochTiming::TruncatedExponential { min, max, .. } => (*min, *max),
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            EpochTiming::Constant(ms) => ms.is_finite() && *ms >= 0.0,
            EpochTiming::Uniform { min, max } => {
                min.is_finite() && max.is_finite() && *min >= 0.0 && min <= max
            }
            EpochTiming::Choice(options) => {
                !options.is_empty() && options.iter().all(|ms| ms.is_finite() && *ms >= 0.0)
            }
            EpochTiming::TruncatedExponential { mean, min, max } => {
                mean.is_finite() && *mean > 0.0 && max.is_finite() && *min >= 0.0 && min <= max
            }
        }
    }
}

/// Round `ms / dt` to the nearest step count. Negative or NaN durations map to zero.
pub fn ms_to_steps(ms: f32, dt: f32) -> usize {
    if !(dt > 0.0) || !(ms > 0.0) {
        return 0;
    }
    (ms / dt).round() as usize
}

/// Timing of the five delayed match-to-sample epochs.
///
/// Fields left out of a JSON config keep the task's default timing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    pub fixation: EpochTiming,
    pub sample: EpochTiming,
    pub delay: EpochTiming,
    pub test: EpochTiming,
    pub decision: EpochTiming,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixation: EpochTiming::Constant(300.0),
            sample: EpochTiming::Constant(500.0),
            delay: EpochTiming::Constant(1000.0),
            test: EpochTiming::Constant(500.0),
            decision: EpochTiming::Constant(900.0),
        }
    }
}

impl TimingConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &EpochTiming)> {
        [
            ("fixation", &self.fixation),
            ("sample", &self.sample),
            ("delay", &self.delay),
            ("test", &self.test),
            ("decision", &self.decision),
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing_in_steps_at_dt_100() {
        let mut rng = Prng::new(1);
        let t = TimingConfig::default();
        let steps: Vec<usize> = t.iter().map(|(_, e)| e.steps(100.0, &mut rng)).collect();
        assert_eq!(steps, vec![3, 5, 10, 5, 9]);
    }

    #[test]
    fn constant_timing_consumes_no_randomness() {
        let mut rng = Prng::new(5);
        let before = rng.state();
        let _ = EpochTiming::Constant(300.0).sample_ms(&mut rng);
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn uniform_and_truncated_exponential_stay_in_bounds() {
        let mut rng = Prng::new(17);
        let uni = EpochTiming::Uniform { min: 200.0, max: 400.0 };
        let exp = EpochTiming::TruncatedExponential { mean: 300.0, min: 100.0, max: 900.0 };
        for _ in 0..500 {
            let u = uni.sample_ms(&mut rng);
            assert!((200.0..=400.0).contains(&u));
            let e = exp.sample_ms(&mut rng);
            assert!((100.0..=900.0).contains(&e));
        }
    }

    #[test]
    fn choice_picks_listed_values() {
        let mut rng = Prng::new(8);
        let c = EpochTiming::Choice(vec![100.0, 300.0]);
        for _ in 0..50 {
            let v = c.sample_ms(&mut rng);
            assert!(v == 100.0 || v == 300.0);
        }
    }

    #[test]
    fn ms_to_steps_rounds_and_rejects_bad_input() {
        assert_eq!(ms_to_steps(300.0, 100.0), 3);
        assert_eq!(ms_to_steps(349.0, 100.0), 3);
        assert_eq!(ms_to_steps(350.0, 100.0), 4);
        assert_eq!(ms_to_steps(-5.0, 100.0), 0);
        assert_eq!(ms_to_steps(f32::NAN, 100.0), 0);
        assert_eq!(ms_to_steps(300.0, 0.0), 0);
    }

    #[test]
    fn well_formed_checks() {
        assert!(EpochTiming::Constant(0.0).is_well_formed());
        assert!(!EpochTiming::Constant(-1.0).is_well_formed());
        assert!(!EpochTiming::Uniform { min: 5.0, max: 1.0 }.is_well_formed());
        assert!(!EpochTiming::Choice(vec![]).is_well_formed());
        let open_ended = EpochTiming::TruncatedExponential { mean: 300.0, min: 0.0, max: f32::INFINITY };
        assert!(!open_ended.is_well_formed());
    }

    #[test]
    fn bounds_cover_every_distribution() {
        assert_eq!(EpochTiming::Constant(300.0).bounds_ms(), (300.0, 300.0));
        assert_eq!(EpochTiming::Uniform { min: 2.0, max: 9.0 }.bounds_ms(), (2.0, 9.0));
        assert_eq!(EpochTiming::Choice(vec![400.0, 100.0, 250.0]).bounds_ms(), (100.0, 400.0));
        let exp = EpochTiming::TruncatedExponential { mean: 300.0, min: 100.0, max: 900.0 };
        assert_eq!(exp.bounds_ms(), (100.0, 900.0));
    }
}
