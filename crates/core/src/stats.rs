//! Running statistics over an unbounded stream of integer samples.
//!
//! The accumulator keeps raw moments only (count, sum, sum of squares) plus
//! the extremes, so recording is O(1) and never allocates. The report uses
//! the population formula on the raw second moment:
//!
//! ```text
//! mean     = sum / count
//! variance = sum_sq / count - mean^2
//! std_dev  = sqrt(variance)
//! ```
//!
//! No stabilisation is attempted. For low-variance samples of large
//! magnitude rounding can push `variance` below zero, and `std_dev` is then
//! NaN. Reporting an empty accumulator divides by zero and yields NaN as
//! well; callers decide whether an empty row is worth printing.
//!
//! `max` starts at zero and `min` at `i64::MAX`, so the first sample always
//! moves `min`, and a stream of only negative samples reports a max of 0.

/// Raw accumulator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsState {
    pub count: u64,
    pub sum: i64,
    pub sum_sq: i64,
    pub min: i64,
    pub max: i64,
}

impl Default for StatsState {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0,
            sum_sq: 0,
            min: i64::MAX,
            max: 0,
        }
    }
}

/// Summary computed from a `StatsState`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReport {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub max: i64,
    pub min: i64,
}

/// Incremental count/mean/std-dev/min/max tracker.
///
/// Owned by exactly one monitor. `report` only reads; nothing ever resets
/// the state, so `count` is monotonic over the accumulator's lifetime.
#[derive(Debug, Clone, Default)]
pub struct OnlineStats {
    state: StatsState,
}

impl OnlineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample.
    ///
    /// Sums wrap on overflow instead of panicking.
    pub fn record(&mut self, value: i64) {
        let state = &mut self.state;
        state.sum = state.sum.wrapping_add(value);
        state.sum_sq = state.sum_sq.wrapping_add(value.wrapping_mul(value));
        state.count += 1;
        state.max = state.max.max(value);
        state.min = state.min.min(value);
    }

    /// Compute the current summary.
    pub fn report(&self) -> StatsReport {
        let state = &self.state;
        let count = state.count as f64;
        let mean = state.sum as f64 / count;
        let variance = state.sum_sq as f64 / count - mean * mean;

        StatsReport {
            count: state.count,
            mean,
            std_dev: variance.sqrt(),
            max: state.max,
            min: state.min,
        }
    }

    pub fn state(&self) -> StatsState {
        self.state
    }

    pub fn count(&self) -> u64 {
        self.state.count
    }

    pub fn is_empty(&self) -> bool {
        self.state.count == 0
    }
}
