//! # epochtask
//!
//! Discrete-time, trial-structured decision tasks from cognitive neuroscience.
//!
//! A trial is a sequence of named epochs (fixation, sample, delay, ...). At trial
//! start the task lays out the epoch timeline and fills an observation buffer
//! and a ground-truth buffer against it; afterwards every time step scores one
//! action against the rules of the epoch the clock is in.
//!
//! ## Quick Start
//!
//! ```
//! use epochtask::prelude::*;
//!
//! let mut env = DelayedMatchToSample::new(DmsConfig::default().with_seed(42));
//! env.new_trial(TrialOverrides::new().ground_truth(1).sample(1));
//! assert_eq!(env.trial().test, 1);
//!
//! // Hold fixation until the go cue, then answer "match".
//! loop {
//!     let action = if env.epochs().in_epoch("decision") {
//!         Action::Match
//!     } else {
//!         Action::Fixate
//!     };
//!     let step = env.step(action);
//!     if step.info.new_trial {
//!         assert_eq!(step.reward, 1.0);
//!         break;
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization of configs, snapshots and reports, and
//!   JSON config loading
//!
//! ## Modules
//!
//! - [`epoch`]: epoch schedule and per-trial buffers
//! - [`timing`]: epoch duration distributions
//! - [`tasks`]: task definitions (delayed match-to-sample)
//! - [`runner`]: scripted driving loop
//! - [`observer`]: read-only snapshots

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/timing.rs"]
pub mod timing;

#[path = "core/epoch.rs"]
pub mod epoch;

#[path = "core/config.rs"]
pub mod config;

pub mod env;
pub mod observer;
pub mod runner;
pub mod stats;
pub mod tasks;

/// Prelude module for convenient imports.
///
/// ```
/// use epochtask::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigError, DmsConfig, Rewards};
    pub use crate::env::{Action, Env, Step, StepInfo};
    pub use crate::epoch::{Anchor, EpochEnv, EpochId, EpochSchedule, EpochSpan};
    pub use crate::runner::{run_session, Policy, SessionReport};
    pub use crate::stats::{TrialOutcome, TrialStats};
    pub use crate::tasks::{DelayedMatchToSample, Trial, TrialOverrides};
    pub use crate::timing::{EpochTiming, TimingConfig};
}
