#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::timing::{ms_to_steps, TimingConfig};

/// Upper bound on the number of steps a single trial may span.
///
/// Every trial allocates `steps * channels` observation floats up front.
pub const MAX_TRIAL_STEPS: usize = 1_000_000;

/// Default input noise scale, `sqrt(2 * 100 * 0.01)`.
pub fn default_sigma() -> f32 {
    (2.0f32 * 100.0 * 0.01).sqrt()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "serde")]
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fixed reward per outcome kind.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Rewards {
    /// Fixation broken before the decision epoch.
    pub aborted: f32,
    pub correct: f32,
    pub fail: f32,
    /// No response by the end of the decision epoch.
    pub miss: f32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            aborted: -0.1,
            correct: 1.0,
            fail: 0.0,
            miss: 0.0,
        }
    }
}

/// Construction-time parameters of a delayed match-to-sample environment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DmsConfig {
    /// Step length in milliseconds.
    pub dt: f32,
    pub timing: TimingConfig,
    pub rewards: Rewards,
    /// End the trial when fixation is broken early.
    pub abort: bool,
    /// Noise scale before the `1/sqrt(dt)` correction.
    pub sigma: f32,
    pub seed: u64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            dt: 100.0,
            timing: TimingConfig::default(),
            rewards: Rewards::default(),
            abort: false,
            sigma: default_sigma(),
            seed: 2026,
        }
    }
}

impl DmsConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_abort(mut self, abort: bool) -> Self {
        self.abort = abort;
        self
    }

    /// Per-step noise standard deviation, `sigma / sqrt(dt)`.
    pub fn sigma_dt(&self) -> f32 {
        self.sigma / self.dt.sqrt()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dt must be a positive number of milliseconds, got {}",
                self.dt
            )));
        }
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sigma must be finite and non-negative, got {}",
                self.sigma
            )));
        }
        let mut shortest = 0usize;
        let mut longest = 0usize;
        for (name, timing) in self.timing.iter() {
            if !timing.is_well_formed() {
                return Err(ConfigError::Invalid(format!(
                    "timing for epoch '{name}' is malformed: {timing:?}"
                )));
            }
            let (lo, hi) = timing.bounds_ms();
            shortest = shortest.saturating_add(ms_to_steps(lo, self.dt));
            longest = longest.saturating_add(ms_to_steps(hi, self.dt));
        }
        if shortest == 0 {
            return Err(ConfigError::Invalid(format!(
                "trial has no time steps at dt = {} ms",
                self.dt
            )));
        }
        if longest > MAX_TRIAL_STEPS {
            return Err(ConfigError::Invalid(format!(
                "trial can span {longest} steps at dt = {} ms, limit is {MAX_TRIAL_STEPS}",
                self.dt
            )));
        }
        Ok(())
    }

    /// Repair an invalid config so it can drive an environment.
    ///
    /// Bad `dt`/`sigma` and malformed epoch timings are replaced by their
    /// defaults. If the trial length is still out of range, `dt` and the whole
    /// timing table fall back to the defaults. Rewards, `abort` and `seed` are kept.
    pub fn sanitized(mut self) -> Self {
        let defaults = DmsConfig::default();
        if !(self.dt.is_finite() && self.dt > 0.0) {
            self.dt = defaults.dt;
        }
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            self.sigma = defaults.sigma;
        }
        let fallback = &defaults.timing;
        let t = &mut self.timing;
        for (slot, default) in [
            (&mut t.fixation, &fallback.fixation),
            (&mut t.sample, &fallback.sample),
            (&mut t.delay, &fallback.delay),
            (&mut t.test, &fallback.test),
            (&mut t.decision, &fallback.decision),
        ] {
            if !slot.is_well_formed() {
                *slot = default.clone();
            }
        }
        if self.validate().is_err() {
            self.dt = defaults.dt;
            self.timing = defaults.timing;
        }
        self
    }

    #[cfg(feature = "serde")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: DmsConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    #[cfg(feature = "serde")]
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
