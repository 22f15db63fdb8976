//! Trial-structured decision tasks built on [`crate::epoch::EpochEnv`].

pub mod delay_match_sample;

pub use delay_match_sample::{DelayedMatchToSample, TaskMetadata, Trial, TrialOverrides};
