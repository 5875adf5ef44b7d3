use uom::si::{f64::Time, time::second};

use crate::{StepSize, TimeOrder};

/// A rolling record of the time values and step sizes of an unsteady
/// simulation.
///
/// The history holds `order + 1` time values and `order` step sizes, both
/// ordered most-recent first: `times[0]` is the time the current step solves
/// for, `times[1]` the previously committed step, and so on. All time values
/// start at zero and all step-size slots start at one second, so a history is
/// valid before any step has been taken.
///
/// The invariant `times[0] == times[1] + step_sizes[0]` is restored by
/// [`sync_current_time`] at the start of every solve, which keeps the current
/// time consistent when a caller re-solves a step with an adjusted step size.
///
/// [`sync_current_time`]: TimeHistory::sync_current_time
#[derive(Debug, Clone, PartialEq)]
pub struct TimeHistory {
    times: Vec<Time>,
    step_sizes: Vec<StepSize>,
}

impl TimeHistory {
    /// Creates a history for the given time order, with all times at zero.
    #[must_use]
    pub fn new(order: TimeOrder) -> Self {
        let initial_step = StepSize::new::<second>(1.0)
            .expect("one second is a valid step size");
        Self {
            times: vec![Time::new::<second>(0.0); order.history_depth()],
            step_sizes: vec![initial_step; order.step_size_depth()],
        }
    }

    /// The time value of the current step.
    #[must_use]
    pub fn time(&self) -> Time {
        self.times[0]
    }

    /// The time value in a given history slot (0 = current).
    ///
    /// # Panics
    ///
    /// Panics if `slot` exceeds the history depth.
    #[must_use]
    pub fn time_at(&self, slot: usize) -> Time {
        self.times[slot]
    }

    /// The current step size, `dt0`.
    #[must_use]
    pub fn step_size(&self) -> StepSize {
        self.step_sizes[0]
    }

    /// All step sizes, most-recent first.
    #[must_use]
    pub fn step_sizes(&self) -> &[StepSize] {
        &self.step_sizes
    }

    /// Number of time slots in the history.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.times.len()
    }

    /// Sets the current step size without touching the time values.
    pub fn set_step_size(&mut self, dt: StepSize) {
        self.step_sizes[0] = dt;
    }

    /// Sets the current step size and recomputes the current time from it.
    pub fn begin_step(&mut self, dt: StepSize) {
        self.set_step_size(dt);
        self.sync_current_time();
    }

    /// Restores `times[0] = times[1] + step_sizes[0]`.
    pub fn sync_current_time(&mut self) {
        self.times[0] = self.times[1] + self.step_sizes[0];
    }

    /// Overwrites the time value in a given history slot.
    ///
    /// Used when restoring a history from a checkpoint.
    ///
    /// # Panics
    ///
    /// Panics if `slot` exceeds the history depth.
    pub fn set_time_at(&mut self, slot: usize, time: Time) {
        self.times[slot] = time;
    }

    /// Shifts all time values and step sizes one slot back, preparing for a
    /// new step.
    ///
    /// The current slots keep their values: `times[0]` is recomputed by the
    /// next solve and `step_sizes[0]` stays until the caller changes it.
    pub fn advance(&mut self) {
        for i in (1..self.times.len()).rev() {
            self.times[i] = self.times[i - 1];
        }
        for i in (1..self.step_sizes.len()).rev() {
            self.step_sizes[i] = self.step_sizes[i - 1];
        }
    }
}
