//! Epoch bookkeeping: the per-trial timeline and the buffers written against it.
//!
//! A trial is laid out once by a [`ScheduleBuilder`], then an [`EpochEnv`]
//! allocates the observation and ground-truth buffers for that schedule and
//! tracks the current time index while the trial runs.

use core::ops::Range;

use hashbrown::HashMap;

/// Index of an epoch inside one [`EpochSchedule`].
pub type EpochId = usize;

/// Where a new epoch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Trial start (step 0).
    Start,
    /// End of a previously declared epoch.
    After(EpochId),
    /// Explicit absolute step.
    At(usize),
}

/// One named interval `[start, end)` in time steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl EpochSpan {
    #[inline]
    pub fn contains(&self, t: usize) -> bool {
        self.start <= t && t < self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleBuilder {
    epochs: Vec<EpochSpan>,
    index: HashMap<String, EpochId>,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an epoch of `steps` time steps placed at `after`.
    ///
    /// An unknown `After` id anchors at trial start. Declaring a name twice
    /// rebinds the name to the newer epoch. The end saturates at `usize::MAX`.
    pub fn add_epoch(&mut self, name: &str, steps: usize, after: Anchor) -> EpochId {
        let start = match after {
            Anchor::Start => 0,
            Anchor::After(prev) => self.epochs.get(prev).map(|e| e.end).unwrap_or(0),
            Anchor::At(step) => step,
        };
        let id = self.epochs.len();
        self.epochs.push(EpochSpan {
            name: name.to_string(),
            start,
            end: start.saturating_add(steps),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Close the schedule. The end of `last` fixes the trial length.
    pub fn finish(self, last: EpochId) -> EpochSchedule {
        let total_steps = self.epochs.get(last).map(|e| e.end).unwrap_or(0);
        EpochSchedule {
            epochs: self.epochs,
            index: self.index,
            last,
            total_steps,
        }
    }
}

/// Ordered, immutable timeline of one trial.
#[derive(Debug, Clone, Default)]
pub struct EpochSchedule {
    epochs: Vec<EpochSpan>,
    index: HashMap<String, EpochId>,
    last: EpochId,
    total_steps: usize,
}

impl EpochSchedule {
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::new()
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn last_epoch(&self) -> Option<&EpochSpan> {
        self.epochs.get(self.last)
    }

    pub fn id(&self, name: &str) -> Option<EpochId> {
        self.index.get(name).copied()
    }

    pub fn span(&self, id: EpochId) -> Option<&EpochSpan> {
        self.epochs.get(id)
    }

    pub fn span_named(&self, name: &str) -> Option<&EpochSpan> {
        self.id(name).and_then(|id| self.span(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EpochSpan> {
        self.epochs.iter()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// The epoch containing step `t`. Zero-length epochs never match.
    pub fn epoch_at(&self, t: usize) -> Option<&EpochSpan> {
        self.epochs.iter().find(|e| e.contains(t))
    }

    /// True when every epoch starts where the previous one ended, the first
    /// starts at 0, and the last declared epoch closes the trial.
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 0;
        for e in &self.epochs {
            if e.start != expected {
                return false;
            }
            expected = e.end;
        }
        expected == self.total_steps
    }
}

/// Mutable rows of one epoch in the observation buffer.
pub struct ObView<'a> {
    data: &'a mut [f32],
    channels: usize,
}

impl<'a> ObView<'a> {
    pub fn rows(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.channels..(r + 1) * self.channels]
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.chunks_exact_mut(self.channels.max(1))
    }

    /// Set `channel` to `value` in every row. Out-of-range channels are ignored.
    pub fn fill_channel(&mut self, channel: usize, value: f32) {
        if channel >= self.channels {
            return;
        }
        for row in self.rows_mut() {
            row[channel] = value;
        }
    }
}

/// Epoch-indexed trial buffers plus the time index into them.
///
/// Rows outside every declared epoch keep the zero baseline written by
/// [`EpochEnv::begin_trial`].
#[derive(Debug, Clone)]
pub struct EpochEnv {
    channels: usize,
    schedule: EpochSchedule,
    ob: Vec<f32>,
    gt: Vec<u32>,
    t_ind: usize,
}

impl EpochEnv {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            schedule: EpochSchedule::default(),
            ob: Vec::new(),
            gt: Vec::new(),
            t_ind: 0,
        }
    }

    /// Install a new schedule, zero both buffers, and rewind the clock.
    pub fn begin_trial(&mut self, schedule: EpochSchedule) {
        let n = schedule.total_steps();
        self.ob.clear();
        self.ob.resize(n * self.channels, 0.0);
        self.gt.clear();
        self.gt.resize(n, 0);
        self.schedule = schedule;
        self.t_ind = 0;
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    pub fn total_steps(&self) -> usize {
        self.schedule.total_steps()
    }

    fn clipped_rows(&self, id: EpochId) -> Range<usize> {
        let n = self.total_steps();
        match self.schedule.span(id) {
            Some(e) => e.start.min(n)..e.end.min(n),
            None => 0..0,
        }
    }

    /// Broadcast `value` over every row of the epoch. Extra values are dropped,
    /// missing channels keep their current contents.
    pub fn set_ob(&mut self, id: EpochId, value: &[f32]) {
        let c = self.channels;
        let k = value.len().min(c);
        for t in self.clipped_rows(id) {
            self.ob[t * c..t * c + k].copy_from_slice(&value[..k]);
        }
    }

    pub fn view_ob(&mut self, id: EpochId) -> ObView<'_> {
        let rows = self.clipped_rows(id);
        let c = self.channels;
        ObView {
            data: &mut self.ob[rows.start * c..rows.end * c],
            channels: c,
        }
    }

    pub fn set_groundtruth(&mut self, id: EpochId, label: u32) {
        for t in self.clipped_rows(id) {
            self.gt[t] = label;
        }
    }

    /// True iff the current time index falls inside the named epoch.
    pub fn in_epoch(&self, name: &str) -> bool {
        self.schedule
            .span_named(name)
            .is_some_and(|e| e.contains(self.t_ind))
    }

    pub fn current_epoch(&self) -> Option<&str> {
        self.schedule.epoch_at(self.t_ind).map(|e| e.name.as_str())
    }

    pub fn t_ind(&self) -> usize {
        self.t_ind
    }

    /// Observation row at step `t`; empty past the end of the trial.
    pub fn ob_at(&self, t: usize) -> &[f32] {
        let c = self.channels;
        self.ob.get(t * c..(t + 1) * c).unwrap_or(&[])
    }

    pub fn obs_now(&self) -> &[f32] {
        self.ob_at(self.t_ind)
    }

    /// Ground-truth label at step `t`; 0 where undefined.
    pub fn gt_at(&self, t: usize) -> u32 {
        self.gt.get(t).copied().unwrap_or(0)
    }

    pub fn gt_now(&self) -> u32 {
        self.gt_at(self.t_ind)
    }

    pub fn ground_truth(&self) -> &[u32] {
        &self.gt
    }

    /// Advance one step. Returns true when the trial has run out of steps.
    pub fn advance(&mut self) -> bool {
        self.t_ind += 1;
        self.is_trial_over()
    }

    pub fn is_trial_over(&self) -> bool {
        self.t_ind >= self.total_steps()
    }

    pub fn reset_clock(&mut self) {
        self.t_ind = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_epochs() -> EpochSchedule {
        let mut b = EpochSchedule::builder();
        let f = b.add_epoch("fixation", 3, Anchor::Start);
        let s = b.add_epoch("sample", 5, Anchor::After(f));
        let d = b.add_epoch("delay", 10, Anchor::After(s));
        let t = b.add_epoch("test", 5, Anchor::After(d));
        let dec = b.add_epoch("decision", 9, Anchor::After(t));
        b.finish(dec)
    }

    #[test]
    fn after_anchors_chain_end_to_start() {
        let s = five_epochs();
        assert!(s.is_contiguous());
        assert_eq!(s.total_steps(), 32);
        assert_eq!(s.span_named("sample").unwrap().range(), 3..8);
        assert_eq!(s.span_named("decision").unwrap().range(), 23..32);
        assert_eq!(s.last_epoch().unwrap().name, "decision");
    }

    #[test]
    fn every_step_maps_to_exactly_one_epoch() {
        let s = five_epochs();
        for t in 0..s.total_steps() {
            let n = s.iter().filter(|e| e.contains(t)).count();
            assert_eq!(n, 1, "t={t}");
        }
        assert!(s.epoch_at(s.total_steps()).is_none());
    }

    #[test]
    fn unknown_anchor_falls_back_to_start_and_breaks_contiguity() {
        let mut b = EpochSchedule::builder();
        let a = b.add_epoch("a", 2, Anchor::Start);
        let c = b.add_epoch("b", 2, Anchor::After(42));
        let s = b.finish(c);
        assert_eq!(s.span(a).unwrap().start, s.span(c).unwrap().start);
        assert!(!s.is_contiguous());
    }

    #[test]
    fn set_ob_broadcasts_and_leaves_other_rows_zero() {
        let s = five_epochs();
        let fix = s.id("fixation").unwrap();
        let mut env = EpochEnv::new(3);
        env.begin_trial(s);
        env.set_ob(fix, &[1.0, 0.0, 0.0]);
        for t in 0..3 {
            assert_eq!(env.ob_at(t), &[1.0, 0.0, 0.0]);
        }
        for t in 3..env.total_steps() {
            assert_eq!(env.ob_at(t), &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn view_ob_writes_in_place() {
        let s = five_epochs();
        let sample = s.id("sample").unwrap();
        let mut env = EpochEnv::new(3);
        env.begin_trial(s);
        {
            let mut v = env.view_ob(sample);
            assert_eq!(v.rows(), 5);
            v.fill_channel(0, 1.0);
            v.fill_channel(9, 5.0);
            for (i, row) in v.rows_mut().enumerate() {
                row[2] = i as f32;
            }
        }
        assert_eq!(env.ob_at(3), &[1.0, 0.0, 0.0]);
        assert_eq!(env.ob_at(7), &[1.0, 0.0, 4.0]);
        assert_eq!(env.ob_at(8), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn groundtruth_only_within_epoch() {
        let s = five_epochs();
        let dec = s.id("decision").unwrap();
        let mut env = EpochEnv::new(3);
        env.begin_trial(s);
        env.set_groundtruth(dec, 2);
        for t in 0..env.total_steps() {
            let expected = if t >= 23 { 2 } else { 0 };
            assert_eq!(env.gt_at(t), expected);
        }
        assert_eq!(env.gt_at(1000), 0);
    }

    #[test]
    fn clock_tracks_epochs() {
        let mut env = EpochEnv::new(3);
        env.begin_trial(five_epochs());
        assert!(env.in_epoch("fixation"));
        assert!(!env.in_epoch("nope"));
        for _ in 0..3 {
            env.advance();
        }
        assert_eq!(env.current_epoch(), Some("sample"));
        while !env.advance() {}
        assert_eq!(env.t_ind(), 32);
        assert!(env.current_epoch().is_none());
        assert!(env.obs_now().is_empty());
        env.reset_clock();
        assert_eq!(env.t_ind(), 0);
    }

    #[test]
    fn add_epoch_saturates_instead_of_overflowing() {
        let mut b = EpochSchedule::builder();
        let first = b.add_epoch("fixation", usize::MAX - 1, Anchor::Start);
        let second = b.add_epoch("sample", 10, Anchor::After(first));
        let s = b.finish(second);
        assert_eq!(s.span(second).map(|e| e.start), Some(usize::MAX - 1));
        assert_eq!(s.total_steps(), usize::MAX);
    }

    #[test]
    fn epochs_past_the_end_are_clipped() {
        let mut b = EpochSchedule::builder();
        let a = b.add_epoch("a", 2, Anchor::Start);
        let late = b.add_epoch("late", 4, Anchor::At(1));
        let s = b.finish(a);
        let mut env = EpochEnv::new(2);
        env.begin_trial(s);
        env.set_ob(late, &[7.0, 7.0, 7.0]);
        env.set_groundtruth(late, 1);
        assert_eq!(env.ob_at(1), &[7.0, 7.0]);
        assert_eq!(env.total_steps(), 2);
        assert_eq!(env.view_ob(late).rows(), 1);
    }
}
